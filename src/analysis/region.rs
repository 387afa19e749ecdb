use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::metrics::SpectralMetrics;
use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// CriticalRegion – a named channel band
// ---------------------------------------------------------------------------

/// A named half-open channel range `[start_channel, end_channel)`.
///
/// Regions may overlap; upper bounds are checked against the spectra when
/// the region is analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalRegion {
    pub name: String,
    pub start_channel: usize,
    pub end_channel: usize,
}

impl CriticalRegion {
    pub fn new(name: impl Into<String>, start_channel: usize, end_channel: usize) -> Result<Self> {
        let name = name.into();
        if start_channel >= end_channel {
            return Err(EngineError::InvalidRegion {
                name,
                reason: format!("start {start_channel} must be below end {end_channel}"),
            });
        }
        Ok(CriticalRegion {
            name,
            start_channel,
            end_channel,
        })
    }

    /// Region covering every channel of a `channels`-long spectrum.
    pub fn full(name: impl Into<String>, channels: usize) -> Result<Self> {
        CriticalRegion::new(name, 0, channels)
    }

    pub fn width(&self) -> usize {
        self.end_channel - self.start_channel
    }

    /// Fail unless the region fits inside `channels`.
    pub fn check_bounds(&self, channels: usize) -> Result<()> {
        if self.start_channel >= self.end_channel || self.end_channel > channels {
            return Err(EngineError::RegionOutOfBounds {
                name: self.name.clone(),
                start: self.start_channel,
                end: self.end_channel,
                channels,
            });
        }
        Ok(())
    }
}

/// Metrics restricted to one region.
pub fn region_metrics(
    reference: &[f64],
    current: &[f64],
    region: &CriticalRegion,
) -> Result<SpectralMetrics> {
    if reference.len() != current.len() {
        return Err(EngineError::ChannelCountMismatch {
            left: reference.len(),
            right: current.len(),
        });
    }
    region.check_bounds(reference.len())?;
    let range = region.start_channel..region.end_channel;
    SpectralMetrics::compute(&reference[range.clone()], &current[range])
}

/// Metrics for every region, keyed by region name.
///
/// Every region is bounds-checked before any metric is computed. A later
/// region with a duplicate name replaces the earlier one.
pub fn analyze_regions(
    reference: &[f64],
    current: &[f64],
    regions: &[CriticalRegion],
) -> Result<BTreeMap<String, SpectralMetrics>> {
    for region in regions {
        region.check_bounds(reference.len())?;
    }
    regions
        .iter()
        .map(|r| Ok((r.name.clone(), region_metrics(reference, current, r)?)))
        .collect()
}

// ---------------------------------------------------------------------------
// WavelengthAxis – nm bands → channel regions
// ---------------------------------------------------------------------------

/// Linear wavelength axis of the instrument, spread evenly over the channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WavelengthAxis {
    pub start_nm: f64,
    pub end_nm: f64,
}

impl Default for WavelengthAxis {
    fn default() -> Self {
        WavelengthAxis {
            start_nm: 900.0,
            end_nm: 1700.0,
        }
    }
}

impl WavelengthAxis {
    pub fn nm_per_channel(&self, channels: usize) -> f64 {
        (self.end_nm - self.start_nm) / channels as f64
    }

    /// Map the band `[wl_start, wl_end]` (nm) onto channels.
    ///
    /// Bands partly outside the instrument range are clamped to it. Bands
    /// entirely outside, or touching it only at an edge, fail with
    /// `RegionOutOfBounds`; bands narrower than one channel fail with
    /// `InvalidRegion`.
    pub fn region(
        &self,
        name: impl Into<String>,
        wl_start: f64,
        wl_end: f64,
        channels: usize,
    ) -> Result<CriticalRegion> {
        let name = name.into();
        if channels == 0 || wl_end <= self.start_nm || wl_start >= self.end_nm {
            return Err(EngineError::RegionOutOfBounds {
                name,
                start: wl_start.max(0.0) as usize,
                end: wl_end.max(0.0) as usize,
                channels,
            });
        }

        let step = self.nm_per_channel(channels);
        let lo = wl_start.max(self.start_nm);
        let hi = wl_end.min(self.end_nm);
        let px_start = ((lo - self.start_nm) / step) as usize;
        let px_end = (((hi - self.start_nm) / step) as usize).min(channels);

        if px_end <= px_start {
            return Err(EngineError::InvalidRegion {
                name,
                reason: format!("{wl_start}-{wl_end} nm covers no whole channel"),
            });
        }
        CriticalRegion::new(name, px_start, px_end)
    }
}

/// NIR absorption bands checked by default, in nm.
pub const DEFAULT_CRITICAL_BANDS: [(f64, f64); 3] =
    [(1100.0, 1200.0), (1400.0, 1500.0), (1600.0, 1700.0)];
