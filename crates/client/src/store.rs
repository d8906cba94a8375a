//! The remote-store capability consumed by the sync layer.
//!
//! [`MaskApi`] is the production implementation; tests substitute an
//! in-memory store.

use std::future::Future;

use slitmask_core::diff::Patch;
use slitmask_core::payload::GenerationRequest;

use crate::api::{MaskApi, MaskApiError};
use crate::artifact::Artifact;
use crate::messages::{InstrumentConfig, MaskLookup, ObjectListEntry};

/// Operations the editor needs from the mask/catalog store.
pub trait MaskStore: Send + Sync {
    /// Look up a mask; a missing mask is [`MaskLookup::NotFound`].
    fn fetch_mask(
        &self,
        mask_name: &str,
        project_name: &str,
    ) -> impl Future<Output = Result<MaskLookup, MaskApiError>> + Send;

    fn fetch_object_list(
        &self,
        list_name: &str,
    ) -> impl Future<Output = Result<ObjectListEntry, MaskApiError>> + Send;

    fn list_project_masks(
        &self,
        project_name: &str,
    ) -> impl Future<Output = Result<Vec<String>, MaskApiError>> + Send;

    fn fetch_instrument_config(
        &self,
        instrument: &str,
    ) -> impl Future<Output = Result<InstrumentConfig, MaskApiError>> + Send;

    /// Apply one object update.
    fn patch_object(&self, patch: &Patch) -> impl Future<Output = Result<(), MaskApiError>> + Send;

    /// Run mask generation and return the produced mask file.
    fn generate_mask(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<Artifact, MaskApiError>> + Send;

    fn complete_mask(
        &self,
        project_name: &str,
        mask_name: &str,
    ) -> impl Future<Output = Result<(), MaskApiError>> + Send;

    /// Derive and return the machine code of a mask.
    fn generate_machine_code(
        &self,
        project_name: &str,
        mask_name: &str,
    ) -> impl Future<Output = Result<Artifact, MaskApiError>> + Send;
}

impl MaskStore for MaskApi {
    async fn fetch_mask(
        &self,
        mask_name: &str,
        project_name: &str,
    ) -> Result<MaskLookup, MaskApiError> {
        MaskApi::fetch_mask(self, mask_name, project_name).await
    }

    async fn fetch_object_list(&self, list_name: &str) -> Result<ObjectListEntry, MaskApiError> {
        MaskApi::fetch_object_list(self, list_name).await
    }

    async fn list_project_masks(&self, project_name: &str) -> Result<Vec<String>, MaskApiError> {
        MaskApi::list_project_masks(self, project_name).await
    }

    async fn fetch_instrument_config(
        &self,
        instrument: &str,
    ) -> Result<InstrumentConfig, MaskApiError> {
        MaskApi::fetch_instrument_config(self, instrument).await
    }

    async fn patch_object(&self, patch: &Patch) -> Result<(), MaskApiError> {
        MaskApi::patch_object(self, patch).await
    }

    async fn generate_mask(&self, request: &GenerationRequest) -> Result<Artifact, MaskApiError> {
        MaskApi::generate_mask(self, request).await
    }

    async fn complete_mask(&self, project_name: &str, mask_name: &str) -> Result<(), MaskApiError> {
        MaskApi::complete_mask(self, project_name, mask_name).await
    }

    async fn generate_machine_code(
        &self,
        project_name: &str,
        mask_name: &str,
    ) -> Result<Artifact, MaskApiError> {
        MaskApi::generate_machine_code(self, project_name, mask_name).await
    }
}
