//! Labels for resources managed on behalf of PackageRevisions.

use std::collections::BTreeMap;

use crate::constants::{labels, values, IMAGE_ENV_VAR};
use crate::error::{OperatorError, Result};

/// Operand image managed by this controller, read from `PackageRevision_IMAGE`.
pub fn image_for_package_revision() -> Result<String> {
    image_from(std::env::var(IMAGE_ENV_VAR).ok())
}

fn image_from(value: Option<String>) -> Result<String> {
    value.ok_or_else(|| {
        OperatorError::Config(format!(
            "unable to find {IMAGE_ENV_VAR} environment variable with the image"
        ))
    })
}

/// Labels for selecting the resources managed by this controller.
pub fn labels_for_package_revision() -> BTreeMap<String, String> {
    labels_for_image(image_for_package_revision().ok().as_deref())
}

fn labels_for_image(image: Option<&str>) -> BTreeMap<String, String> {
    let image_tag = image
        .and_then(|i| i.split(':').nth(1))
        .unwrap_or_default();

    BTreeMap::from([
        (labels::NAME.to_string(), values::APP_NAME.to_string()),
        (labels::VERSION.to_string(), image_tag.to_string()),
        (labels::MANAGED_BY.to_string(), values::MANAGED_BY.to_string()),
    ])
}

/// Label selector matching resources managed by this controller.
pub fn managed_by_selector() -> String {
    format!("{}={}", labels::MANAGED_BY, values::MANAGED_BY)
}
