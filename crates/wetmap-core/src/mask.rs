use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::consts::{
    PARALLEL_ITEM_THRESHOLD, QA_CLOUD_BIT, QA_CLOUD_CONFIDENCE_HIGH_BIT, QA_CLOUD_SHADOW_BIT,
};
use crate::error::{Result, WetmapError};
use crate::scene::{MaskFamily, Scene, SceneCollection};

/// Landsat 8: clear iff neither cloud shadow nor cloud is flagged.
pub fn qa_valid_oli(qa: u16) -> bool {
    qa & QA_CLOUD_SHADOW_BIT == 0 && qa & QA_CLOUD_BIT == 0
}

/// Landsat 5/7: cloudy iff (cloud AND high confidence) OR cloud shadow.
pub fn qa_valid_tm_etm(qa: u16) -> bool {
    let cloud = (qa & QA_CLOUD_BIT != 0 && qa & QA_CLOUD_CONFIDENCE_HIGH_BIT != 0)
        || qa & QA_CLOUD_SHADOW_BIT != 0;
    !cloud
}

/// Clear-sky mask for a QA layer under the given family's bit conventions.
pub fn qa_mask(qa: &Array2<u16>, family: MaskFamily) -> Array2<bool> {
    match family {
        MaskFamily::Oli => qa.mapv(qa_valid_oli),
        MaskFamily::TmEtm => qa.mapv(qa_valid_tm_etm),
    }
}

/// Mask cloud and cloud-shadow pixels of a scene.
///
/// Values are preserved; only validity changes. For TM/ETM+ scenes the
/// mask is also intersected with the minimum of the existing validity over
/// all bands, so a pixel missing in any band is missing in every band.
pub fn mask_clouds(scene: &Scene) -> Result<Scene> {
    let mut raster = scene.raster.clone();
    if let Some(dim) = raster.dim() {
        if dim != scene.qa.dim() {
            return Err(WetmapError::DimensionMismatch {
                expected: dim,
                actual: scene.qa.dim(),
            });
        }
    }

    let family = scene.sensor.mask_family();
    raster.update_mask(&qa_mask(&scene.qa, family));

    if family == MaskFamily::TmEtm {
        if let Some(all_bands) = scene.raster.min_mask() {
            raster.update_mask(&all_bands);
        }
    }

    Ok(scene.with_raster(raster))
}

/// Apply [`mask_clouds`] to every scene.
pub fn mask_collection(collection: &SceneCollection) -> Result<SceneCollection> {
    let scenes = collection.scenes();
    let masked: Vec<Scene> = if scenes.len() >= PARALLEL_ITEM_THRESHOLD {
        scenes.par_iter().map(mask_clouds).collect::<Result<_>>()?
    } else {
        scenes.iter().map(mask_clouds).collect::<Result<_>>()?
    };
    debug!(scenes = masked.len(), "Cloud masking complete");
    Ok(SceneCollection::new(masked))
}
