//! `colors` extension: reports the colors used by each icon.

use std::collections::BTreeMap;

use log::info;

use super::svg::{self, color_styles, Color, SvgDocument};
use crate::catalog::IconRecord;
use crate::extension::{
    Capability, Extension, ExtensionError, IconHandle, IconProcessingError, RunContext,
};

pub const TAG: &str = "colors";

/// Icons using each color, over the whole run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ColorUsage(pub BTreeMap<Color, Vec<String>>);

pub struct ColorsExtension;

impl Extension for ColorsExtension {
    fn tag(&self) -> &str {
        TAG
    }

    fn description(&self) -> &str {
        "logs colors found in icon styles"
    }

    fn requires(&self) -> Vec<&str> {
        vec![svg::TAG]
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Process, Capability::Finish]
    }

    fn process(
        &self,
        icon: &mut IconHandle<'_>,
        cx: &mut RunContext<'_>,
    ) -> Result<(), IconProcessingError> {
        let document = icon
            .peer::<SvgDocument>(svg::TAG)
            .ok_or_else(|| icon.fail("no parsed SVG document"))?;
        let usage = cx.state_mut::<ColorUsage>();
        for style in color_styles(document) {
            info!(
                "event=color_found module=colors status=ok icon={} element={} property={} color={}",
                icon.name(),
                style.element,
                style.property,
                style.color
            );
            let icons = usage.0.entry(style.color).or_default();
            if icons.last().map(String::as_str) != Some(icon.name()) {
                icons.push(icon.name().to_string());
            }
        }
        Ok(())
    }

    fn finish(&self, cx: &mut RunContext<'_>, _icons: &[IconRecord]) -> Result<(), ExtensionError> {
        let distinct = cx.state::<ColorUsage>().map(|usage| usage.0.len()).unwrap_or(0);
        info!("event=colors_done module=colors status=ok distinct={distinct}");
        Ok(())
    }
}
