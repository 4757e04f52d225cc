use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::validation::{ImageKind, ImageUpload};

/// A selected image that decoded cleanly. Only its dimensions are kept;
/// the bytes stay with the upload.
#[derive(Clone)]
pub struct LoadedImage {
    pub size: [usize; 2],
}

impl LoadedImage {
    pub fn decode(upload: &ImageUpload, kind: ImageKind) -> Result<Self, ValidationError> {
        let dyn_img = image::load_from_memory_with_format(upload.bytes(), kind.format())
            .map_err(|source| ValidationError::Undecodable {
                file_name: upload.file_name.clone(),
                source,
            })?;
        Ok(Self {
            size: [dyn_img.width() as usize, dyn_img.height() as usize],
        })
    }

    pub fn width(&self) -> usize {
        self.size[0]
    }

    pub fn height(&self) -> usize {
        self.size[1]
    }
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedImage").field("size", &self.size).finish()
    }
}

/// Tracks which preview handles are alive.
///
/// Handles are acquired when a file is selected and released when the handle
/// is dropped, so a handle can never be released twice.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashMap<Uuid, String>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, file_name: &str, image: LoadedImage) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.entries().insert(id, file_name.to_string());
        debug!("acquired preview {id} for {file_name}");
        PreviewHandle {
            id,
            image: Arc::new(image),
            registry: self.clone(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.entries().len()
    }

    pub fn is_live(&self, id: Uuid) -> bool {
        self.entries().contains_key(&id)
    }

    fn release(&self, id: Uuid) {
        if let Some(file_name) = self.entries().remove(&id) {
            debug!("released preview {id} for {file_name}");
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Uuid, String>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A locally resolvable reference to the selected image.
pub struct PreviewHandle {
    id: Uuid,
    image: Arc<LoadedImage>,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn image(&self) -> &LoadedImage {
        &self.image
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("id", &self.id)
            .field("size", &self.image.size)
            .finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}
