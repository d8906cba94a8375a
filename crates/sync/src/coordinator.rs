//! The mask editing workflow.
//!
//! [`SyncCoordinator`] owns the session state: the open mask, the catalog
//! list being edited, the generation parameters and the last generated
//! artifact. Every operation takes `&mut self`, so at most one operation
//! is in flight and only one edit session can be open. Network failures
//! are returned to the caller and leave the coordinator usable.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use slitmask_client::artifact::Artifact;
use slitmask_client::messages::{InstrumentConfig, MaskLookup};
use slitmask_client::{MaskApiError, MaskStore};
use slitmask_core::catalog::{CellValue, NumericColumn, ObjectRecord};
use slitmask_core::error::CoreError;
use slitmask_core::geometry::build_footprint;
use slitmask_core::mask::MaskDocument;
use slitmask_core::payload::{
    assemble, AssemblyContext, GenerationRequest, MaskParameterSet, DEFAULT_INSTRUMENT,
};
use slitmask_core::session::EditSession;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::renderer::{LabelStyle, OverlayStyle, PolygonStyle, SkyRenderer, ViewOptions};
use crate::state::SessionState;

/// File name of the saved-rows export.
pub const EXPORT_FILENAME: &str = "edited-objects.json";

/// What a render request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// No mask or no slits: a placeholder is shown, nothing was drawn.
    Placeholder,
    /// The renderer did not initialise.
    Unavailable,
    Drawn {
        slits: usize,
        skipped: usize,
    },
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    /// Number of object updates sent.
    pub patched: usize,
    /// The new baseline: the coerced draft.
    pub rows: Vec<ObjectRecord>,
}

pub struct SyncCoordinator<S, R> {
    store: S,
    renderer: R,
    user_id: String,
    project_name: String,
    download_dir: PathBuf,
    state: SessionState,
    /// Ready flavour to return to when editing ends.
    resume_state: SessionState,
    mask_name: Option<String>,
    mask: Option<MaskDocument>,
    session: EditSession,
    params: MaskParameterSet,
    artifact: Option<Artifact>,
}

impl<S: MaskStore, R: SkyRenderer> SyncCoordinator<S, R> {
    pub fn new(store: S, renderer: R, config: &SyncConfig) -> Self {
        Self {
            store,
            renderer,
            user_id: config.user_id.clone(),
            project_name: config.project_name.clone(),
            download_dir: config.download_dir.clone(),
            state: SessionState::Idle,
            resume_state: SessionState::Ready,
            mask_name: None,
            mask: None,
            session: EditSession::default(),
            params: MaskParameterSet::form_defaults(),
            artifact: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn mask_name(&self) -> Option<&str> {
        self.mask_name.as_deref()
    }

    /// The loaded mask; `None` before loading and in `NoMaskYet`.
    pub fn mask(&self) -> Option<&MaskDocument> {
        self.mask.as_ref()
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn parameters(&self) -> &MaskParameterSet {
        &self.params
    }

    /// Replace the generation parameters (form input).
    pub fn set_parameters(&mut self, params: MaskParameterSet) {
        self.params = params;
    }

    /// The last generated mask file.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    // ---- loading ----

    /// Fetch a mask with its object lists.
    ///
    /// A mask the store does not know yet puts the session in
    /// [`SessionState::NoMaskYet`] rather than failing. A mask carrying an
    /// instrument setup replaces the generation parameters with it; a setup
    /// that cannot be read is logged and the current parameters are kept.
    /// Any other failure restores the previous state.
    pub async fn open_mask(&mut self, mask_name: &str) -> Result<SessionState, SyncError> {
        self.require("open a mask", |s| {
            matches!(
                s,
                SessionState::Idle
                    | SessionState::Ready
                    | SessionState::NoMaskYet
                    | SessionState::Generated
                    | SessionState::Finalized
            )
        })?;

        let previous = self.state;
        self.enter(SessionState::Loading);
        tracing::info!(mask = %mask_name, project = %self.project_name, "Loading mask");

        match self.store.fetch_mask(mask_name, &self.project_name).await {
            Ok(MaskLookup::Found(doc)) => {
                tracing::info!(
                    mask = %mask_name,
                    slits = doc.features.len(),
                    objects = doc.obj_list.len(),
                    excluded = doc.excluded_obj_list.len(),
                    "Mask loaded",
                );
                match doc.parameters() {
                    Ok(Some(params)) => self.params = params,
                    Ok(None) => {}
                    Err(e) => tracing::warn!(
                        mask = %mask_name,
                        error = %e,
                        "Ignoring unreadable instrument setup",
                    ),
                }
                self.mask = Some(*doc);
                self.mask_name = Some(mask_name.to_string());
                self.enter(SessionState::Ready);
            }
            Ok(MaskLookup::NotFound) => {
                tracing::info!(mask = %mask_name, "Mask not generated yet");
                self.mask = None;
                self.mask_name = Some(mask_name.to_string());
                self.enter(SessionState::NoMaskYet);
            }
            Err(e) => {
                tracing::error!(mask = %mask_name, error = %e, "Failed to load mask");
                self.enter(previous);
                return Err(e.into());
            }
        }
        Ok(self.state)
    }

    /// Load a named catalog list as the edit baseline.
    ///
    /// Rejected while editing. From `Idle` the session becomes `Ready`;
    /// otherwise the state is kept.
    pub async fn load_catalog(&mut self, list_name: &str) -> Result<usize, SyncError> {
        self.require("load a catalog list", |s| {
            !s.is_busy() && *s != SessionState::Editing
        })?;

        let previous = self.state;
        self.enter(SessionState::Loading);
        tracing::info!(list = %list_name, "Loading catalog list");

        let entry = match self.store.fetch_object_list(list_name).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(list = %list_name, error = %e, "Failed to load catalog list");
                self.enter(previous);
                return Err(e.into());
            }
        };

        let count = entry.objects.len();
        let name = if entry.list_name.is_empty() {
            list_name.to_string()
        } else {
            entry.list_name
        };
        tracing::info!(list = %name, rows = count, "Catalog list loaded");
        self.session.load(name, entry.objects);
        self.enter(if previous == SessionState::Idle {
            SessionState::Ready
        } else {
            previous
        });
        Ok(count)
    }

    // ---- rendering ----

    /// Draw the open mask's slits into `container`.
    ///
    /// Nothing is sent to the renderer when there is no mask or it has no
    /// slits. Slits with unparsable coordinates are skipped.
    pub async fn render(&mut self, container: &str) -> Result<RenderOutcome, SyncError> {
        self.require("render", |s| !s.is_busy())?;

        let Some(mask) = self.mask.as_ref() else {
            tracing::debug!(state = %self.state, "No mask to render, showing placeholder");
            return Ok(RenderOutcome::Placeholder);
        };
        if mask.features.is_empty() {
            tracing::debug!("Mask has no slits, showing placeholder");
            return Ok(RenderOutcome::Placeholder);
        }

        if !self.renderer.init().await {
            tracing::warn!("Sky renderer unavailable, skipping render");
            return Ok(RenderOutcome::Unavailable);
        }

        let view = ViewOptions::centred_on(mask.center_ra(), mask.center_dec());
        self.renderer.create_view(container, &view);
        self.renderer.add_overlay(&OverlayStyle::default());

        let polygon_style = PolygonStyle::default();
        let label_style = LabelStyle::default();
        let mut skipped = 0;
        for slit in &mask.features {
            let footprint = build_footprint(slit);
            if !footprint.is_finite() {
                tracing::warn!(
                    slit = %slit.id,
                    ra = %slit.ra,
                    dec = %slit.dec,
                    "Skipping slit with non-finite coordinates",
                );
                skipped += 1;
                continue;
            }
            self.renderer
                .add_polygon(&footprint.vertices, &polygon_style);
            let label = &footprint.label;
            self.renderer
                .add_label(label.ra, label.dec, &label.text, &label_style);
        }

        let slits = mask.features.len() - skipped;
        tracing::info!(slits, skipped, "Rendered mask");
        Ok(RenderOutcome::Drawn { slits, skipped })
    }

    // ---- editing ----

    /// Enter edit mode with a copy of the baseline, or leave it and
    /// discard the draft. Returns whether the session is now editing.
    pub fn toggle_edit(&mut self) -> Result<bool, SyncError> {
        if self.state == SessionState::Editing {
            self.session.toggle();
            self.enter(self.resume_state);
            tracing::info!("Edit discarded");
            return Ok(false);
        }

        self.require("start editing", SessionState::is_ready)?;
        if self.session.list_name().is_none() {
            return Err(SyncError::NoCatalogList);
        }
        self.resume_state = self.state;
        self.session.toggle();
        self.enter(SessionState::Editing);
        tracing::info!(rows = self.session.baseline().len(), "Editing catalog list");
        Ok(true)
    }

    /// Set one numeric cell of the draft.
    pub fn edit_cell(
        &mut self,
        row: usize,
        column: NumericColumn,
        value: impl Into<CellValue>,
    ) -> Result<(), SyncError> {
        self.require("edit a cell", |s| *s == SessionState::Editing)?;
        self.session.edit_cell(row, column, value.into())?;
        Ok(())
    }

    /// Replace the whole draft.
    pub fn replace_draft(&mut self, rows: Vec<ObjectRecord>) -> Result<(), SyncError> {
        self.require("replace the draft", |s| *s == SessionState::Editing)?;
        self.session.replace_draft(rows)?;
        Ok(())
    }

    /// Send every pending change to the store.
    ///
    /// All updates are dispatched at once. The save succeeds only if every
    /// update does; the coerced draft then becomes the baseline. On any
    /// failure the session stays in edit mode with the draft intact, and
    /// updates that already went through stay applied on the store.
    pub async fn save(&mut self) -> Result<SaveOutcome, SyncError> {
        self.require("save", |s| *s == SessionState::Editing)?;
        if self.session.list_name().is_none() {
            return Err(SyncError::NoCatalogList);
        }
        let patches = self.session.pending_patches(&self.user_id)?;
        let total = patches.len();

        self.enter(SessionState::Saving);
        tracing::info!(
            list = self.session.list_name().unwrap_or_default(),
            patches = total,
            "Saving catalog edits",
        );

        let store = &self.store;
        let requests = patches.iter().map(|patch| store.patch_object(patch));
        let results = join_all(requests).await;

        let mut failures: Vec<MaskApiError> = Vec::new();
        for (patch, result) in patches.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(object = %patch.obj_name, error = %e, "Object update failed");
                failures.push(e);
            }
        }

        if !failures.is_empty() {
            let failed = failures.len();
            tracing::error!(failed, total, "Save rejected, draft kept for retry");
            self.enter(SessionState::Editing);
            let first = failures.swap_remove(0);
            return Err(SyncError::SaveFailed {
                failed,
                total,
                first,
            });
        }

        let rows = self.session.commit()?.to_vec();
        self.enter(self.resume_state);
        tracing::info!(patched = total, rows = rows.len(), "Catalog edits saved");
        Ok(SaveOutcome {
            patched: total,
            rows,
        })
    }

    /// Write the baseline rows as pretty JSON into the download directory.
    pub async fn export_rows(&self) -> Result<PathBuf, SyncError> {
        let json = serde_json::to_vec_pretty(self.session.baseline())?;
        let path = self.write_download(EXPORT_FILENAME, &json).await?;
        tracing::info!(
            path = %path.display(),
            rows = self.session.baseline().len(),
            "Exported rows",
        );
        Ok(path)
    }

    // ---- generation ----

    /// The request [`generate`](Self::generate) would send right now.
    pub fn generation_request(&self) -> GenerationRequest {
        let ctx = AssemblyContext {
            user_id: self.user_id.clone(),
            project_name: Some(self.project_name.clone()),
            objects: self.session.list_name().map(str::to_string),
            today: chrono::Local::now().date_naive(),
        };
        assemble(&self.params, &ctx)
    }

    /// Generate a mask from the current parameters and keep the produced
    /// file. On failure the session returns to its ready state.
    pub async fn generate(&mut self) -> Result<&Artifact, SyncError> {
        self.require("generate a mask", |s| {
            s.is_ready() || *s == SessionState::Generated
        })?;

        let fallback = if self.state == SessionState::NoMaskYet {
            SessionState::NoMaskYet
        } else {
            SessionState::Ready
        };
        let request = self.generation_request();
        self.enter(SessionState::Generating);
        tracing::info!(
            title = %request.title,
            project = %request.project_name,
            objects = request.objects.as_deref().unwrap_or_default(),
            "Generating mask",
        );

        match self.store.generate_mask(&request).await {
            Ok(artifact) => {
                tracing::info!(
                    filename = %artifact.filename,
                    bytes = artifact.bytes.len(),
                    "Mask generated",
                );
                self.enter(SessionState::Generated);
                let artifact: &Artifact = self.artifact.insert(artifact);
                Ok(artifact)
            }
            Err(e) => {
                tracing::error!(error = %e, "Mask generation failed");
                self.artifact = None;
                self.enter(fallback);
                Err(e.into())
            }
        }
    }

    /// Mark the generated mask complete. Needs a project name and a mask
    /// title; a failure leaves the mask `Generated` so it can be retried.
    pub async fn finalize(&mut self) -> Result<(), SyncError> {
        self.require("finalize", |s| *s == SessionState::Generated)?;

        let project = self.project_name.trim();
        if project.is_empty() {
            let e = CoreError::Validation("project name is required to finalize".into());
            return Err(e.into());
        }
        let title = self
            .params
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CoreError::Validation("mask title is required to finalize".into()))?
            .to_string();
        let project = project.to_string();

        self.enter(SessionState::Finalizing);
        tracing::info!(mask = %title, project = %project, "Finalizing mask");

        match self.store.complete_mask(&project, &title).await {
            Ok(()) => {
                tracing::info!(mask = %title, "Mask finalized");
                self.enter(SessionState::Finalized);
                Ok(())
            }
            Err(e) => {
                tracing::error!(mask = %title, error = %e, "Mask finalization failed");
                self.enter(SessionState::Generated);
                Err(e.into())
            }
        }
    }

    /// Derive and download the machine code of `mask_name`. Does not
    /// change the session state.
    pub async fn machine_code(&self, mask_name: &str) -> Result<Artifact, SyncError> {
        self.require("generate machine code", |s| !s.is_busy())?;
        tracing::info!(mask = %mask_name, "Generating machine code");

        let artifact = self
            .store
            .generate_machine_code(&self.project_name, mask_name)
            .await
            .inspect_err(|e| {
                tracing::error!(mask = %mask_name, error = %e, "Machine code failed");
            })?;
        tracing::info!(
            filename = %artifact.filename,
            bytes = artifact.bytes.len(),
            "Machine code ready",
        );
        Ok(artifact)
    }

    // ---- lookups ----

    pub async fn list_masks(&self) -> Result<Vec<String>, SyncError> {
        Ok(self.store.list_project_masks(&self.project_name).await?)
    }

    /// Filter and disperser choices for the selected instrument, or the
    /// default instrument when none is selected.
    pub async fn instrument_config(&self) -> Result<InstrumentConfig, SyncError> {
        let instrument = self
            .params
            .instrument
            .as_deref()
            .filter(|i| !i.is_empty())
            .unwrap_or(DEFAULT_INSTRUMENT);
        Ok(self.store.fetch_instrument_config(instrument).await?)
    }

    // ---- downloads ----

    /// Write an artifact into the download directory. Only the final path
    /// component of its name is used.
    pub async fn save_artifact(&self, artifact: &Artifact) -> Result<PathBuf, SyncError> {
        let name = Path::new(&artifact.filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                CoreError::Validation(format!("unusable file name '{}'", artifact.filename))
            })?;
        let path = self.write_download(name, &artifact.bytes).await?;
        tracing::info!(path = %path.display(), bytes = artifact.bytes.len(), "Saved artifact");
        Ok(path)
    }

    // ---- private helpers ----

    async fn write_download(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, SyncError> {
        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    fn require(
        &self,
        operation: &'static str,
        allowed: impl Fn(&SessionState) -> bool,
    ) -> Result<(), SyncError> {
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(SyncError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn enter(&mut self, next: SessionState) {
        debug_assert!(
            self.state == next || self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next,
        );
        tracing::debug!(from = %self.state, to = %next, "Session state change");
        self.state = next;
    }
}
