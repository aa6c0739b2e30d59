//! Robertson soil behaviour type classification.
//!
//! Each sample is placed on the cone-resistance / friction-ratio chart and
//! receives the catalog entry whose region contains it. Consecutive samples
//! with the same soil type form one layer.

use std::sync::Arc;

use crate::convert::check_mm;
use crate::data::model::Sample;
use crate::error::ClassificationError;
use crate::layout::{SoilLayer, SoilLayout};
use crate::soil::{ClassificationRule, SoilCatalog, SoilType};

/// Atmospheric pressure in MPa, used to normalize `qc`.
pub const PA_MPA: f64 = 0.1;

/// Thickness given to the last layer when there is only one sample and no
/// spacing to repeat.
pub const DEFAULT_SAMPLE_SPACING: i64 = 20;

/// Soil behaviour type index (Robertson 2010) for `qc` in MPa and `rf` in
/// percent. `None` outside the chart, i.e. for non-positive readings.
pub fn behaviour_index(qc: f64, rf: f64) -> Option<f64> {
    if !(qc > 0.0 && rf > 0.0 && qc.is_finite() && rf.is_finite()) {
        return None;
    }
    let a = 3.47 - (qc / PA_MPA).log10();
    let b = rf.log10() + 1.22;
    Some((a * a + b * b).sqrt())
}

fn rule_matches(rule: &ClassificationRule, qn: f64, rf: f64, index: f64) -> bool {
    match *rule {
        ClassificationRule::Sensitive { coefficient, decay } => {
            qn < coefficient * (-decay * rf).exp()
        }
        ClassificationRule::Stiff { min_qn, min_rf, max_rf } => {
            qn >= min_qn && rf >= min_rf && max_rf.map_or(true, |max| rf < max)
        }
        ClassificationRule::IndexRange { min, max } => {
            min.map_or(true, |min| index >= min) && max.map_or(true, |max| index < max)
        }
    }
}

/// Soil type for a single sample. Region rules are tried before index
/// bands; catalog order decides within each group.
pub fn classify_sample<'a>(
    sample: &Sample,
    catalog: &'a SoilCatalog,
) -> Result<&'a Arc<SoilType>, ClassificationError> {
    if let Some(index) = behaviour_index(sample.qc, sample.rf) {
        let qn = sample.qc / PA_MPA;
        let ruled = || catalog.iter().filter_map(|s| s.rule.as_ref().map(|r| (s, r)));
        let hit = ruled()
            .filter(|(_, r)| r.is_region())
            .chain(ruled().filter(|(_, r)| !r.is_region()))
            .find(|(_, r)| rule_matches(r, qn, sample.rf, index));
        if let Some((soil, _)) = hit {
            return Ok(soil);
        }
    }
    catalog.fallback().ok_or(ClassificationError::NoMatchingSoil {
        depth: sample.depth,
        qc: sample.qc,
        rf: sample.rf,
    })
}

/// Classify depth-ordered samples into the original, sample-resolution
/// layout. A layer runs from the elevation of its first sample to that of
/// the next layer's first sample; the last layer extends one sample spacing
/// below the deepest sample.
pub fn classify(
    samples: &[Sample],
    catalog: &SoilCatalog,
) -> Result<SoilLayout, ClassificationError> {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(ClassificationError::NoSamples),
    };
    for (index, pair) in samples.windows(2).enumerate() {
        if pair[1].depth <= pair[0].depth {
            return Err(ClassificationError::UnorderedSamples {
                index: index + 1,
                previous: pair[0].depth,
                depth: pair[1].depth,
            });
        }
    }
    for sample in samples {
        check_mm(sample.depth)?;
        check_mm(sample.elevation)?;
    }

    let mut layers: Vec<SoilLayer> = Vec::new();
    let mut current: Option<(&Arc<SoilType>, i64)> = None;
    let mut fallbacks = 0usize;

    for sample in samples {
        let soil = classify_sample(sample, catalog)?;
        if soil.rule.is_none() {
            fallbacks += 1;
        }
        match current {
            Some((active, _)) if active == soil => {}
            Some((active, top)) => {
                layers.push(SoilLayer::new(Arc::clone(active), top, sample.elevation));
                current = Some((soil, sample.elevation));
            }
            None => current = Some((soil, sample.elevation)),
        }
    }

    let spacing = match samples {
        [.., before, last] => last.depth - before.depth,
        _ => DEFAULT_SAMPLE_SPACING,
    };
    if let Some((active, top)) = current {
        layers.push(SoilLayer::new(Arc::clone(active), top, last.elevation - spacing));
    }

    if fallbacks > 0 {
        log::warn!("{fallbacks} samples fell outside the chart and were classified as unknown");
    }
    log::debug!(
        "classified {} samples ({} mm to {} mm) into {} layers",
        samples.len(),
        first.depth,
        last.depth + spacing,
        layers.len()
    );

    SoilLayout::new(layers).map_err(ClassificationError::Layout)
}
