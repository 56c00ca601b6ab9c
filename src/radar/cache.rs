use chrono::NaiveDateTime;
use log::{debug, warn};
use ndarray::Array2;

use crate::error::{Error, Result};
use crate::provider::{RadarItem, RadarProvider, ScanMetadata};
use crate::radar::RadarRequest;
use crate::radar::RadarRequestUpdate;
use crate::raster::{radolan_crs, radolan_transform, Raster};

/// Memoized raster stack for one radar request.
///
/// The cache owns all artifacts derived from the current request
/// fingerprint: raw grids, georeferenced rasters, and per-timestamp
/// metadata. Index `i` of every view refers to the same acquisition.
/// Changing any request field discards everything; that is the only
/// invalidation trigger.
#[derive(Debug, Default)]
pub struct RadarCache {
    request: RadarRequest,
    fingerprint: Option<String>,
    grids: Vec<Array2<f64>>,
    rasters: Vec<Raster>,
    attributes: Vec<ScanMetadata>,
    timestamps: Vec<NaiveDateTime>,
}

impl RadarCache {
    pub fn new(request: RadarRequest) -> Self {
        Self {
            request,
            ..Self::default()
        }
    }

    pub fn request(&self) -> &RadarRequest {
        &self.request
    }

    /// Merge partial fields into the request. If the resulting fingerprint
    /// differs, every memoized artifact and the stored hash are dropped.
    pub fn set_parameters(&mut self, update: RadarRequestUpdate) {
        let mut next = self.request.clone();
        next.apply(update);
        if next != self.request {
            debug!("radar request changed, clearing {} cached scans", self.grids.len());
            self.clear();
            self.request = next;
        }
    }

    fn clear(&mut self) {
        self.grids.clear();
        self.rasters.clear();
        self.attributes.clear();
        self.timestamps.clear();
        self.fingerprint = None;
    }

    /// Whether the stack holds data for the current request.
    pub fn is_loaded(&self) -> bool {
        self.fingerprint.as_deref() == Some(self.request.fingerprint().as_str())
    }

    /// Populate the stack, issuing exactly one provider query unless the
    /// current request is already loaded.
    ///
    /// Items are consumed in provider-return order. A single scan that fails
    /// to decode is logged and skipped; an empty result is a valid, empty
    /// stack. Returns the number of cached scans.
    pub fn load<P: RadarProvider>(&mut self, provider: &P) -> Result<usize> {
        if self.is_loaded() {
            return Ok(self.grids.len());
        }
        self.clear();

        let items = provider.query(&self.request).map_err(Error::Provider)?;
        for item in items {
            let scan = match item.decode() {
                Ok(scan) => scan,
                Err(err) => {
                    warn!("failed to decode scan at {}: {err:#}", item.timestamp());
                    continue;
                }
            };

            let (rows, cols) = scan.grid.dim();
            let raster = Raster::from_south_up(
                scan.grid.clone(),
                radolan_transform(rows, cols),
                radolan_crs(),
                Some(scan.meta.nodata),
            );

            self.timestamps.push(scan.meta.timestamp);
            self.grids.push(scan.grid);
            self.rasters.push(raster);
            self.attributes.push(scan.meta);
        }

        self.fingerprint = Some(self.request.fingerprint());
        debug!("loaded {} radar scans", self.grids.len());
        Ok(self.grids.len())
    }

    /// Raw south-up grids, as decoded.
    pub fn grids(&self) -> &[Array2<f64>] {
        &self.grids
    }

    /// Georeferenced rasters ready for clipping.
    pub fn rasters(&self) -> &[Raster] {
        &self.rasters
    }

    /// Per-scan metadata, aligned with `grids()` and `rasters()`.
    pub fn attributes(&self) -> &[ScanMetadata] {
        &self.attributes
    }

    /// Acquisition timestamps, aligned with the other views.
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RadarScan;
    use crate::radar::{RadarPeriod, RadarRequestUpdate};
    use ahash::AHashMap;
    use anyhow::anyhow;
    use chrono::NaiveDate;
    use std::cell::Cell;

    struct FakeItem {
        timestamp: NaiveDateTime,
        broken: bool,
    }

    impl RadarItem for FakeItem {
        fn timestamp(&self) -> NaiveDateTime {
            self.timestamp
        }

        fn decode(&self) -> anyhow::Result<RadarScan> {
            if self.broken {
                return Err(anyhow!("truncated composite"));
            }
            Ok(RadarScan {
                grid: Array2::from_elem((4, 4), 1.5),
                meta: ScanMetadata {
                    timestamp: self.timestamp,
                    nodata: -9999.0,
                    extra: AHashMap::new(),
                },
            })
        }
    }

    struct FakeProvider {
        scans: usize,
        broken_at: Option<usize>,
        queries: Cell<usize>,
    }

    impl FakeProvider {
        fn new(scans: usize, broken_at: Option<usize>) -> Self {
            Self {
                scans,
                broken_at,
                queries: Cell::new(0),
            }
        }
    }

    impl RadarProvider for FakeProvider {
        type Item = FakeItem;

        fn query(&self, _request: &RadarRequest) -> anyhow::Result<Vec<FakeItem>> {
            self.queries.set(self.queries.get() + 1);
            let day0 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
            Ok((0..self.scans)
                .map(|i| FakeItem {
                    timestamp: day0.succ_opt().unwrap().and_hms_opt(i as u32, 0, 0).unwrap(),
                    broken: self.broken_at == Some(i),
                })
                .collect())
        }
    }

    #[test]
    fn load_populates_aligned_views() {
        let provider = FakeProvider::new(3, None);
        let mut cache = RadarCache::new(RadarRequest::default());
        assert_eq!(cache.load(&provider).unwrap(), 3);
        assert_eq!(cache.grids().len(), 3);
        assert_eq!(cache.rasters().len(), 3);
        assert_eq!(cache.attributes().len(), 3);
        assert_eq!(cache.timestamps().len(), 3);
        assert_eq!(cache.timestamps()[1], cache.attributes()[1].timestamp);
    }

    #[test]
    fn load_is_memoized_per_fingerprint() {
        let provider = FakeProvider::new(2, None);
        let mut cache = RadarCache::new(RadarRequest::default());
        cache.load(&provider).unwrap();
        cache.load(&provider).unwrap();
        assert_eq!(provider.queries.get(), 1);
    }

    #[test]
    fn broken_scan_is_skipped_not_fatal() {
        let provider = FakeProvider::new(3, Some(1));
        let mut cache = RadarCache::new(RadarRequest::default());
        assert_eq!(cache.load(&provider).unwrap(), 2);
        assert_eq!(cache.timestamps().len(), 2);
    }

    #[test]
    fn empty_result_is_an_empty_stack() {
        let provider = FakeProvider::new(0, None);
        let mut cache = RadarCache::new(RadarRequest::default());
        assert_eq!(cache.load(&provider).unwrap(), 0);
        assert!(cache.is_loaded());
    }

    #[test]
    fn parameter_change_clears_every_view() {
        let provider = FakeProvider::new(2, None);
        let mut cache = RadarCache::new(RadarRequest::default());
        cache.load(&provider).unwrap();

        cache.set_parameters(RadarRequestUpdate::period(RadarPeriod::Historical));
        assert!(cache.grids().is_empty());
        assert!(cache.rasters().is_empty());
        assert!(cache.attributes().is_empty());
        assert!(cache.timestamps().is_empty());
        assert!(!cache.is_loaded());

        // reload under the new fingerprint issues a fresh query
        cache.load(&provider).unwrap();
        assert_eq!(provider.queries.get(), 2);
        assert_eq!(cache.grids().len(), 2);
    }

    #[test]
    fn identical_update_keeps_the_stack() {
        let provider = FakeProvider::new(2, None);
        let mut cache = RadarCache::new(RadarRequest::default());
        cache.load(&provider).unwrap();
        cache.set_parameters(RadarRequestUpdate::default());
        assert!(cache.is_loaded());
        assert_eq!(cache.grids().len(), 2);
    }
}
