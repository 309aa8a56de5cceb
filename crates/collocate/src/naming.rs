//! Planning of the bands of the collocated product and their names.

use std::collections::HashSet;

use crate::{
    BandDescriptor, CollocationOptions, Error, Result, SampleCoding, SourceProduct,
    options::{ORIGINAL_NAME_REFERENCE, SLAVE_NUMBER_ID_REFERENCE},
};

const PRESENCE_FLAG_BAND_NAME: &str = "collocationFlags";
pub(crate) const PRESENCE_FLAG_NODATA: f64 = 0.0;

/// Where the values of a target band come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetBandSource {
    /// Band of the master product, copied unchanged
    Master { band: usize },
    /// Band of a slave product, resampled onto the master grid
    Slave { slave: usize, band: usize },
    /// 1 where the slave has a valid correspondence, 0 elsewhere
    PresenceFlag { slave: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetBand {
    pub name: String,
    pub source: TargetBandSource,
    /// Coding of the source band, presence flag bands are flag coded
    pub coding: SampleCoding,
    /// No-data value written for pixels without a valid result, in the geophysical domain
    pub nodata: Option<f64>,
}

impl TargetBand {
    fn from_band(name: String, source: TargetBandSource, band: &BandDescriptor) -> Self {
        TargetBand {
            name,
            source,
            coding: band.coding,
            nodata: band.raw_nodata().map(|_| band.geophysical_nodata()),
        }
    }

    fn presence_flag(name: String, slave: usize) -> Self {
        TargetBand {
            name,
            source: TargetBandSource::PresenceFlag { slave },
            coding: SampleCoding::Flag,
            nodata: Some(PRESENCE_FLAG_NODATA),
        }
    }

    /// Name of the flag of a presence flag band: `SLAVE_PRESENT` or `SLAVE_<i>_PRESENT` when there are multiple slaves
    pub fn flag_name(&self, slave_count: usize) -> Option<String> {
        match self.source {
            TargetBandSource::PresenceFlag { slave } if slave_count > 1 => Some(format!("SLAVE_{slave}_PRESENT")),
            TargetBandSource::PresenceFlag { .. } => Some("SLAVE_PRESENT".to_string()),
            _ => None,
        }
    }
}

fn apply_pattern(pattern: &str, name: &str, slave_id: &str) -> String {
    pattern.replace(ORIGINAL_NAME_REFERENCE, name).replace(SLAVE_NUMBER_ID_REFERENCE, slave_id)
}

/// Appends a numeric suffix to `name` until it does not collide with any of the `taken` names
fn unique_name(name: String, taken: &HashSet<String>) -> String {
    if !taken.contains(&name) {
        return name;
    }

    let mut count = 1;
    loop {
        let candidate = format!("{name}{count}");
        if !taken.contains(&candidate) {
            return candidate;
        }

        count += 1;
    }
}

fn add_band(bands: &mut Vec<TargetBand>, names: &mut HashSet<String>, band: TargetBand) -> Result<()> {
    if !names.insert(band.name.clone()) {
        return Err(Error::InvalidArgument(format!("Duplicate target band name '{}'", band.name)));
    }

    bands.push(band);
    Ok(())
}

/// The bands of the collocated product: the master bands, followed per slave by its bands and its presence flag band.
///
/// Slave bands are also renamed when their name collides with a band that was planned before.
/// Fails when the configured patterns produce duplicate names.
pub fn plan_target_bands(master: &SourceProduct, slaves: &[SourceProduct], opts: &CollocationOptions) -> Result<Vec<TargetBand>> {
    let mut bands = Vec::new();
    let mut names = HashSet::new();

    for (index, band) in master.bands.iter().enumerate() {
        let name = if opts.rename_master_components {
            apply_pattern(&opts.master_component_pattern, &band.name, "")
        } else {
            band.name.clone()
        };

        add_band(
            &mut bands,
            &mut names,
            TargetBand::from_band(name, TargetBandSource::Master { band: index }, band),
        )?;
    }

    // flag band names only avoid the master band names
    let flag_names: Vec<String> = slaves
        .iter()
        .map(|slave| {
            let name = if slaves.len() == 1 {
                PRESENCE_FLAG_BAND_NAME.to_string()
            } else {
                format!("{PRESENCE_FLAG_BAND_NAME}_{}", slave.name)
            };

            unique_name(name, &names)
        })
        .collect();

    for (slave_index, (slave, flag_name)) in slaves.iter().zip(flag_names).enumerate() {
        let slave_id = if slaves.len() > 1 { slave_index.to_string() } else { String::new() };

        for (index, band) in slave.bands.iter().enumerate() {
            let name = if opts.rename_slave_components || names.contains(&band.name) {
                apply_pattern(&opts.slave_component_pattern, &band.name, &slave_id)
            } else {
                band.name.clone()
            };

            let source = TargetBandSource::Slave {
                slave: slave_index,
                band: index,
            };
            add_band(&mut bands, &mut names, TargetBand::from_band(name, source, band))?;
        }

        add_band(&mut bands, &mut names, TargetBand::presence_flag(flag_name, slave_index))?;
    }

    Ok(bands)
}
