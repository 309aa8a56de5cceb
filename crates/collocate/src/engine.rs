//! Tile based collocation of slave products onto the grid of a master product.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use geo::PixelRect;

use crate::{
    BandResamplingPolicy, CollocationOptions, Error, PixelMapper, ResamplingMethod, Result, SampleDecoder, Scaling, SourceProduct,
    TileMapping, TileSink,
    naming::{PRESENCE_FLAG_NODATA, TargetBand, TargetBandSource, plan_target_bands},
};

/// Cooperative cancellation of a collocation run, checked before a tile is started
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of tiles the master grid is divided in
    pub tile_count: usize,
    /// Number of tiles that were written to the sink
    pub completed_tiles: usize,
    /// The run was cancelled before all tiles were processed
    pub cancelled: bool,
}

/// Resamples the bands of one or more slave products onto the grid of the master product.
///
/// The target bands are the master bands (copied), the resampled slave bands and a presence flag band per slave.
/// All planning happens at construction, computing a tile only reads shared immutable state so tiles can be processed concurrently.
pub struct CollocationEngine {
    master: SourceProduct,
    slaves: Vec<SourceProduct>,
    options: CollocationOptions,
    mapper: PixelMapper,
    target_bands: Vec<TargetBand>,
    policies: Vec<BandResamplingPolicy>,
    /// Window margin per slave, the largest margin required by the bands of the slave
    margins: Vec<usize>,
}

fn presence_flag_policy() -> BandResamplingPolicy {
    BandResamplingPolicy {
        method: ResamplingMethod::NearestNeighbour,
        decoder: SampleDecoder::new(None, Scaling::default()),
        nodata: PRESENCE_FLAG_NODATA,
    }
}

impl CollocationEngine {
    pub fn new(master: SourceProduct, slaves: Vec<SourceProduct>, options: CollocationOptions) -> Result<Self> {
        options.validate()?;

        if slaves.is_empty() {
            return Err(Error::InvalidArgument("At least one slave product is required".into()));
        }

        let target_bands = plan_target_bands(&master, &slaves, &options)?;
        let policies: Vec<BandResamplingPolicy> = target_bands
            .iter()
            .map(|target| match target.source {
                TargetBandSource::Master { band } => BandResamplingPolicy::copy(&master.bands[band]),
                TargetBandSource::Slave { slave, band } => BandResamplingPolicy::resolve(&slaves[slave].bands[band], options.resampling),
                TargetBandSource::PresenceFlag { .. } => presence_flag_policy(),
            })
            .collect();

        let margins = (0..slaves.len())
            .map(|slave_index| {
                target_bands
                    .iter()
                    .zip(&policies)
                    .filter(|(target, _)| matches!(target.source, TargetBandSource::Slave { slave, .. } if slave == slave_index))
                    .map(|(_, policy)| policy.method.margin())
                    .max()
                    .unwrap_or(ResamplingMethod::NearestNeighbour.margin())
            })
            .collect();

        log::debug!(
            "Collocation of {} slave product(s) onto '{}' {}: {} target bands",
            slaves.len(),
            master.name,
            master.grid.size(),
            target_bands.len()
        );

        Ok(CollocationEngine {
            mapper: PixelMapper::with_error_threshold(options.error_threshold),
            master,
            slaves,
            options,
            target_bands,
            policies,
            margins,
        })
    }

    pub fn master(&self) -> &SourceProduct {
        &self.master
    }

    pub fn slaves(&self) -> &[SourceProduct] {
        &self.slaves
    }

    pub fn options(&self) -> &CollocationOptions {
        &self.options
    }

    /// The bands of the collocated product, a `TileSink` receives the band index in this list
    pub fn target_bands(&self) -> &[TargetBand] {
        &self.target_bands
    }

    pub fn policy(&self, target_band: usize) -> Option<&BandResamplingPolicy> {
        self.policies.get(target_band)
    }

    /// The tiles of the master grid, row-major
    pub fn tiles(&self) -> Vec<PixelRect> {
        self.master.grid.bounds().tiles(self.options.tile_size)
    }

    fn check_tile(&self, rect: PixelRect) -> Result<()> {
        if !self.master.grid.bounds().contains(&rect) {
            return Err(Error::InvalidArgument(format!(
                "Tile {rect} is not inside the master grid {}",
                self.master.grid.size()
            )));
        }

        Ok(())
    }

    fn map_tile(&self, slave: usize, rect: PixelRect) -> TileMapping {
        let mapping = self
            .mapper
            .map_tile(self.master.grid.transform(), rect, &self.slaves[slave].grid, self.margins[slave]);

        match mapping.window() {
            Some(window) => log::debug!(
                "Tile {rect}: {} of {} pixels map to '{}', window {window}",
                mapping.valid_count(),
                rect.pixel_count(),
                self.slaves[slave].name
            ),
            None => log::debug!("Tile {rect}: no correspondence with '{}'", self.slaves[slave].name),
        }

        mapping
    }

    /// Computes all target bands of a tile of the master grid and writes them to the sink.
    /// The pixel mapping is computed once per slave and shared by its bands.
    pub fn compute_tile(&self, rect: PixelRect, sink: &dyn TileSink) -> Result<()> {
        self.check_tile(rect)?;

        let mut mappings: Vec<Option<TileMapping>> = vec![None; self.slaves.len()];
        for (index, target) in self.target_bands.iter().enumerate() {
            let mapping = match target.source {
                TargetBandSource::Master { .. } => None,
                TargetBandSource::Slave { slave, .. } | TargetBandSource::PresenceFlag { slave } => {
                    Some(&*mappings[slave].get_or_insert_with(|| self.map_tile(slave, rect)))
                }
            };

            self.write_band_tile(index, rect, mapping, sink)?;
        }

        Ok(())
    }

    /// Computes a single target band of a tile of the master grid and writes it to the sink
    pub fn compute_band_tile(&self, target_band: usize, rect: PixelRect, sink: &dyn TileSink) -> Result<()> {
        self.check_tile(rect)?;

        let target = self
            .target_bands
            .get(target_band)
            .ok_or_else(|| Error::InvalidArgument(format!("Invalid target band index: {target_band}")))?;

        let mapping = match target.source {
            TargetBandSource::Master { .. } => None,
            TargetBandSource::Slave { slave, .. } | TargetBandSource::PresenceFlag { slave } => Some(self.map_tile(slave, rect)),
        };

        self.write_band_tile(target_band, rect, mapping.as_ref(), sink)
    }

    fn write_band_tile(&self, target_band: usize, rect: PixelRect, mapping: Option<&TileMapping>, sink: &dyn TileSink) -> Result<()> {
        let target = &self.target_bands[target_band];
        let policy = &self.policies[target_band];

        let result = match (target.source, mapping) {
            (TargetBandSource::Master { band }, _) => self.copy_master_band(band, policy, rect),
            (TargetBandSource::Slave { slave, band }, Some(mapping)) => self.resample_slave_band(slave, band, policy, mapping),
            (TargetBandSource::PresenceFlag { .. }, Some(mapping)) => Ok(presence_flags(mapping)),
            (_, None) => Err(Error::Runtime(format!("No pixel mapping for band '{}'", target.name))),
        };

        result
            .and_then(|values| sink.write_tile(target_band, rect, &values))
            .map_err(|err| Error::TileFailed {
                tile: rect,
                band: target.name.clone(),
                source: Box::new(err),
            })
    }

    fn copy_master_band(&self, band: usize, policy: &BandResamplingPolicy, rect: PixelRect) -> Result<Vec<f64>> {
        let buffer = self.master.source.read_window(band, rect)?;
        let samples = buffer.decode(&policy.decoder, self.master.grid.size());

        Ok(samples.into_values().into_iter().map(|value| policy.output_value(value)).collect())
    }

    fn resample_slave_band(&self, slave: usize, band: usize, policy: &BandResamplingPolicy, mapping: &TileMapping) -> Result<Vec<f64>> {
        let product = &self.slaves[slave];

        let Some(window) = mapping.window() else {
            return Ok(vec![policy.nodata; mapping.positions().len()]);
        };

        let buffer = product.source.read_window(band, window)?;
        let samples = buffer.decode(&policy.decoder, product.grid.size());

        mapping
            .positions()
            .iter()
            .map(|pos| match pos {
                Some(pos) => policy
                    .method
                    .resample(*pos, &samples)
                    .map(|value| policy.output_value(value))
                    .map_err(|outside| Error::GridContractViolation {
                        grid: product.name.clone(),
                        band: product.bands[band].name.clone(),
                        rect: PixelRect::new(outside.col, outside.row, 1, 1),
                        grid_size: product.grid.size(),
                    }),
                None => Ok(policy.nodata),
            })
            .collect()
    }

    /// Computes all tiles of the master grid and writes them to the sink.
    /// The cancellation token is checked before every tile, a cancelled run is not an error.
    pub fn run(&self, sink: &dyn TileSink, cancel: &CancellationToken) -> Result<RunSummary> {
        let tiles = self.tiles();
        let completed = AtomicUsize::new(0);

        log::info!(
            "Collocating {} slave product(s) onto '{}' {} using {}: {} tiles of {}",
            self.slaves.len(),
            self.master.name,
            self.master.grid.size(),
            self.options.resampling,
            tiles.len(),
            self.options.tile_size
        );

        let process_tile = |tile: &PixelRect| -> Result<()> {
            if cancel.is_cancelled() {
                return Ok(());
            }

            self.compute_tile(*tile, sink)?;
            completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        let thread_count = self.options.num_threads.count();
        if thread_count.is_some_and(|count| count <= 1) || !cfg!(feature = "rayon") {
            tiles.iter().try_for_each(process_tile)?;
        } else {
            #[cfg(feature = "rayon")]
            {
                use rayon::prelude::*;
                let pool = create_thread_pool(thread_count)?;
                pool.install(|| tiles.par_iter().try_for_each(process_tile))?;
            }
        }

        let summary = RunSummary {
            tile_count: tiles.len(),
            completed_tiles: completed.load(Ordering::SeqCst),
            cancelled: cancel.is_cancelled() && completed.load(Ordering::SeqCst) < tiles.len(),
        };

        if summary.cancelled {
            log::warn!(
                "Collocation onto '{}' cancelled after {} of {} tiles",
                self.master.name,
                summary.completed_tiles,
                summary.tile_count
            );
        } else {
            log::info!("Collocation onto '{}' finished: {} tiles", self.master.name, summary.completed_tiles);
        }

        Ok(summary)
    }
}

impl std::fmt::Debug for CollocationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollocationEngine")
            .field("master", &self.master.name)
            .field("slaves", &self.slaves.iter().map(|slave| slave.name.as_str()).collect::<Vec<_>>())
            .field("target_bands", &self.target_bands)
            .finish_non_exhaustive()
    }
}

fn presence_flags(mapping: &TileMapping) -> Vec<f64> {
    mapping.positions().iter().map(|pos| if pos.is_some() { 1.0 } else { 0.0 }).collect()
}

#[cfg(feature = "rayon")]
fn create_thread_pool(thread_count: Option<usize>) -> Result<rayon::ThreadPool> {
    let mut pool_builder = rayon::ThreadPoolBuilder::new();
    if let Some(count) = thread_count {
        pool_builder = pool_builder.num_threads(count);
    }

    pool_builder
        .build()
        .map_err(|e| Error::Runtime(format!("Failed to create threadpool: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use geo::{DataType, RasterSize};

    use super::*;
    use crate::{BandDescriptor, MemorySampleSource, MemoryTileSink, SampleData, testutils, testutils::NOD};

    fn float_band(name: &str) -> BandDescriptor {
        BandDescriptor::new(name, DataType::Float32).with_nodata(NOD)
    }

    /// Values `col + 10 * row`
    fn ramp(size: RasterSize) -> Vec<f32> {
        (0..size.cell_count()).map(|i| ((i % size.cols) + 10 * (i / size.cols)) as f32).collect()
    }

    fn options(resampling: ResamplingMethod) -> CollocationOptions {
        CollocationOptions {
            resampling,
            tile_size: RasterSize::square(3),
            ..Default::default()
        }
    }

    fn run_to_memory(engine: &CollocationEngine) -> Result<MemoryTileSink> {
        let sink = MemoryTileSink::new(engine.master().grid.size(), engine.target_bands().len());
        let summary = engine.run(&sink, &CancellationToken::new())?;
        assert_eq!(summary.completed_tiles, summary.tile_count);
        assert!(!summary.cancelled);
        Ok(sink)
    }

    #[test_log::test]
    fn identity_collocation_with_nearest_neighbour() -> Result<()> {
        let size = RasterSize::with_rows_cols(5, 7);
        let values = ramp(size);

        let master = testutils::memory_product(
            "master",
            testutils::degree_grid(size, 2.0, 51.0),
            vec![(float_band("m1"), SampleData::from(vec![3.0f32; size.cell_count()]))],
        )?;
        let slave = testutils::memory_product(
            "slave",
            testutils::degree_grid(size, 2.0, 51.0),
            vec![(float_band("s1"), SampleData::from(values.clone()))],
        )?;

        let engine = CollocationEngine::new(master, vec![slave], options(ResamplingMethod::NearestNeighbour))?;
        let names: Vec<&str> = engine.target_bands().iter().map(|band| band.name.as_str()).collect();
        assert_eq!(names, ["m1_M", "s1_S", "collocationFlags"]);

        let sink = run_to_memory(&engine)?;
        assert!(sink.band(0)?.iter().all(|&v| v == 3.0));
        assert_eq!(sink.band(1)?, values.iter().map(|&v| v as f64).collect::<Vec<_>>());
        assert!(sink.band(2)?.iter().all(|&v| v == 1.0));
        Ok(())
    }

    /// 4x4 slave with values `col + 4 * row` and a no-data sample at (1, 1),
    /// the master grid is shifted half a pixel to the right
    fn nodata_setup(resampling: ResamplingMethod) -> Result<CollocationEngine> {
        let size = RasterSize::square(4);
        let mut values: Vec<f32> = (0..16).map(|i| i as f32).collect();
        values[5] = NOD as f32;

        let master = testutils::memory_product("master", testutils::degree_grid(size, 0.5, 0.0), vec![])?;
        let slave = testutils::memory_product(
            "slave",
            testutils::degree_grid(size, 0.0, 0.0),
            vec![(float_band("b1"), SampleData::from(values))],
        )?;

        CollocationEngine::new(master, vec![slave], options(resampling))
    }

    #[test_log::test]
    fn bilinear_nodata_propagation() -> Result<()> {
        let engine = nodata_setup(ResamplingMethod::Bilinear)?;
        let result = run_to_memory(&engine)?.band(0)?;

        for row in 0..4 {
            for col in 0..4 {
                let value = result[row * 4 + col];
                // the neighbourhood of (col + 0.5, row) includes (1, 1) for col and row in 0..=1, the last column has no correspondence
                if (col <= 1 && row <= 1) || col == 3 {
                    assert_eq!(value, NOD, "({col}, {row})");
                } else {
                    assert_relative_eq!(value, col as f64 + 0.5 + 4.0 * row as f64);
                }
            }
        }

        Ok(())
    }

    #[test_log::test]
    fn cubic_nodata_propagation() -> Result<()> {
        for method in [ResamplingMethod::CubicConvolution, ResamplingMethod::BiCubic] {
            let engine = nodata_setup(method)?;
            let result = run_to_memory(&engine)?.band(0)?;

            for row in 0..4 {
                for col in 0..4 {
                    let value = result[row * 4 + col];
                    if row <= 2 || col == 3 {
                        assert_eq!(value, NOD, "{method} ({col}, {row})");
                    } else {
                        assert_ne!(value, NOD, "{method} ({col}, {row})");
                        assert!(value.is_finite());
                    }
                }
            }

            // the neighbourhood of (1.5, 3) is not clamped horizontally
            assert_relative_eq!(result[3 * 4 + 1], 13.5, epsilon = 1e-9);
        }

        Ok(())
    }

    #[test_log::test]
    fn flag_bands_use_nearest_neighbour() -> Result<()> {
        let size = RasterSize::with_rows_cols(1, 4);
        let master = testutils::memory_product("master", testutils::degree_grid(size, 0.5, 0.0), vec![])?;
        let slave = testutils::memory_product(
            "slave",
            testutils::degree_grid(size, 0.0, 0.0),
            vec![
                (BandDescriptor::new("flags", DataType::Uint8).with_flag_coding(), SampleData::from(vec![1u8, 2, 4, 8])),
                (float_band("rad"), SampleData::from(vec![1.0f32, 2.0, 3.0, 4.0])),
            ],
        )?;

        let engine = CollocationEngine::new(master, vec![slave], options(ResamplingMethod::Bilinear))?;
        assert_eq!(engine.policy(0).map(|p| p.method), Some(ResamplingMethod::NearestNeighbour));
        assert_eq!(engine.policy(1).map(|p| p.method), Some(ResamplingMethod::Bilinear));

        let sink = run_to_memory(&engine)?;
        let flags = sink.band(0)?;
        assert_eq!(&flags[..3], &[2.0, 4.0, 8.0]);
        // no-data is not used for the flag band
        assert!(flags[3].is_nan());

        let rad = sink.band(1)?;
        assert_eq!(&rad[..3], &[1.5, 2.5, 3.5]);
        assert_eq!(rad[3], NOD);

        assert_eq!(sink.band(2)?, [1.0, 1.0, 1.0, 0.0]);
        Ok(())
    }

    #[test_log::test]
    fn empty_correspondence_does_not_read() -> Result<()> {
        let size = RasterSize::square(6);
        let master = testutils::memory_product("master", testutils::degree_grid(size, 0.0, 0.0), vec![])?;
        let slave = testutils::memory_product(
            "slave",
            testutils::degree_grid(size, 100.0, 0.0),
            vec![(float_band("b1"), SampleData::from(ramp(size)))],
        )?;
        let (slave, reads) = testutils::with_read_counter(slave);

        let engine = CollocationEngine::new(master, vec![slave], options(ResamplingMethod::BiCubic))?;
        let sink = run_to_memory(&engine)?;

        assert_eq!(reads.read_count(), 0);
        assert!(sink.band(0)?.iter().all(|&v| v == NOD));
        assert!(sink.band(1)?.iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test_log::test]
    fn half_pixel_shift_bilinear() -> Result<()> {
        let size = RasterSize::square(4);
        let values: Vec<f32> = (0..16).map(|i| ((i % 4) + 1 + 10 * (i / 4)) as f32).collect();

        // master pixel (c, r) corresponds to slave position (c - 0.5, r)
        let master = testutils::memory_product("master", testutils::degree_grid(size, -0.5, 0.0), vec![])?;
        let slave = testutils::memory_product(
            "slave",
            testutils::degree_grid(size, 0.0, 0.0),
            vec![(float_band("b1"), SampleData::from(values))],
        )?;

        let engine = CollocationEngine::new(master, vec![slave], options(ResamplingMethod::Bilinear))?;
        let result = run_to_memory(&engine)?.band(0)?;

        for (value, expected) in result[..4].iter().zip([1.0, 1.5, 2.5, 3.5]) {
            assert_relative_eq!(*value, expected);
        }

        Ok(())
    }

    #[test_log::test]
    fn scaled_bands_are_resampled_in_the_geophysical_domain() -> Result<()> {
        let size = RasterSize::with_rows_cols(1, 3);
        let band = BandDescriptor::new("sst", DataType::Int16)
            .with_nodata(-32768.0)
            .with_scaling(Scaling::linear(0.01, 20.0));

        let master = testutils::memory_product("master", testutils::degree_grid(size, 0.5, 0.0), vec![])?;
        let slave = testutils::memory_product(
            "slave",
            testutils::degree_grid(size, 0.0, 0.0),
            vec![(band, SampleData::from(vec![100i16, 300, -32768]))],
        )?;

        let engine = CollocationEngine::new(master, vec![slave], options(ResamplingMethod::Bilinear))?;
        let result = run_to_memory(&engine)?.band(0)?;

        assert_relative_eq!(result[0], 22.0, epsilon = 1e-9);
        assert_relative_eq!(result[1], -307.68, epsilon = 1e-9);
        assert_relative_eq!(result[2], -307.68, epsilon = 1e-9);
        Ok(())
    }

    #[test_log::test]
    fn contract_violation_fails_the_tile() -> Result<()> {
        let size = RasterSize::square(8);
        let master = testutils::memory_product("master", testutils::degree_grid(size, 0.0, 0.0), vec![])?;

        // the reader only holds the top left quarter of the grid
        let reader = MemorySampleSource::new("slave", RasterSize::square(4)).with_band("b1", vec![0.0f32; 16])?;
        let slave = SourceProduct::new("slave", testutils::degree_grid(size, 0.0, 0.0), vec![float_band("b1")], Arc::new(reader));

        let engine = CollocationEngine::new(
            master,
            vec![slave],
            CollocationOptions {
                tile_size: RasterSize::square(8),
                ..Default::default()
            },
        )?;

        let sink = MemoryTileSink::new(size, engine.target_bands().len());
        match engine.run(&sink, &CancellationToken::new()) {
            Err(Error::TileFailed { tile, band, source }) => {
                assert_eq!(tile, PixelRect::new(0, 0, 8, 8));
                assert_eq!(band, "b1_S");
                assert!(matches!(*source, Error::GridContractViolation { .. }), "{source}");
            }
            other => panic!("Unexpected run result: {other:?}"),
        }

        Ok(())
    }

    #[test_log::test]
    fn cancelled_before_run() -> Result<()> {
        let size = RasterSize::square(6);
        let master = testutils::memory_product("master", testutils::degree_grid(size, 0.0, 0.0), vec![])?;
        let slave = testutils::memory_product(
            "slave",
            testutils::degree_grid(size, 0.0, 0.0),
            vec![(float_band("b1"), SampleData::from(ramp(size)))],
        )?;
        let (slave, reads) = testutils::with_read_counter(slave);

        let engine = CollocationEngine::new(master, vec![slave], options(ResamplingMethod::Bilinear))?;
        let sink = MemoryTileSink::new(size, engine.target_bands().len());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = engine.run(&sink, &cancel)?;

        assert_eq!(
            summary,
            RunSummary {
                tile_count: 4,
                completed_tiles: 0,
                cancelled: true,
            }
        );
        assert_eq!(reads.read_count(), 0);
        assert!(sink.band(0)?.iter().all(|v| v.is_nan()));
        Ok(())
    }

    #[test_log::test]
    fn single_band_tile() -> Result<()> {
        let size = RasterSize::square(4);
        let master = testutils::memory_product("master", testutils::degree_grid(size, 0.0, 0.0), vec![])?;
        let slave = testutils::memory_product(
            "slave",
            testutils::degree_grid(RasterSize::square(2), 1.0, -1.0),
            vec![(float_band("b1"), SampleData::from(vec![1.0f32, 2.0, 3.0, 4.0]))],
        )?;
        let (slave, reads) = testutils::with_read_counter(slave);

        let engine = CollocationEngine::new(master, vec![slave], options(ResamplingMethod::NearestNeighbour))?;
        let sink = MemoryTileSink::new(size, engine.target_bands().len());

        engine.compute_band_tile(0, PixelRect::new(0, 0, 4, 4), &sink)?;
        assert_eq!(reads.read_count(), 1);

        #[rustfmt::skip]
        let expected = [
            NOD, NOD, NOD, NOD,
            NOD, 1.0, 2.0, NOD,
            NOD, 3.0, 4.0, NOD,
            NOD, NOD, NOD, NOD,
        ];
        assert_eq!(sink.band(0)?, expected);

        // the presence flag band is not computed
        assert!(sink.band(1)?.iter().all(|v| v.is_nan()));

        assert!(engine.compute_band_tile(2, PixelRect::new(0, 0, 4, 4), &sink).is_err());
        assert!(engine.compute_band_tile(0, PixelRect::new(2, 2, 4, 4), &sink).is_err());
        Ok(())
    }

    #[test_log::test]
    fn multiple_slaves() -> Result<()> {
        let size = RasterSize::square(3);
        let master = testutils::memory_product("master", testutils::degree_grid(size, 0.0, 0.0), vec![])?;
        let slave1 = testutils::memory_product(
            "s1",
            testutils::degree_grid(size, 0.0, 0.0),
            vec![(float_band("b1"), SampleData::from(vec![1.0f32; 9]))],
        )?;
        let slave2 = testutils::memory_product(
            "s2",
            testutils::degree_grid(size, 1.0, 0.0),
            vec![(float_band("b1"), SampleData::from(vec![2.0f32; 9]))],
        )?;

        let engine = CollocationEngine::new(master, vec![slave1, slave2], options(ResamplingMethod::Bilinear))?;
        let names: Vec<&str> = engine.target_bands().iter().map(|band| band.name.as_str()).collect();
        assert_eq!(names, ["b1_S0", "collocationFlags_s1", "b1_S1", "collocationFlags_s2"]);

        let sink = run_to_memory(&engine)?;
        assert!(sink.band(0)?.iter().all(|&v| v == 1.0));
        assert!(sink.band(1)?.iter().all(|&v| v == 1.0));
        assert_eq!(sink.band(2)?, [NOD, 2.0, 2.0, NOD, 2.0, 2.0, NOD, 2.0, 2.0]);
        assert_eq!(sink.band(3)?, [0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]);
        Ok(())
    }

    #[test_log::test]
    fn interpolated_mapping_matches_exact_run() -> Result<()> {
        let create_engine = |error_threshold| -> Result<CollocationEngine> {
            let size = RasterSize::square(30);
            let master = testutils::memory_product("master", testutils::degree_grid_with_cell_size(size, 3.5, 49.5, 0.02), vec![])?;

            // smooth surface: neighbouring samples differ by 0.5
            let slave_grid = testutils::curved_grid()?;
            let cols = slave_grid.width();
            let values: Vec<f32> = (0..slave_grid.size().cell_count())
                .map(|i| 0.5 * ((i % cols) + (i / cols)) as f32)
                .collect();
            let slave = testutils::memory_product("slave", slave_grid, vec![(float_band("b1"), SampleData::from(values))])?;

            CollocationEngine::new(
                master,
                vec![slave],
                CollocationOptions {
                    resampling: ResamplingMethod::Bilinear,
                    tile_size: RasterSize::square(16),
                    error_threshold,
                    ..Default::default()
                },
            )
        };

        let exact = run_to_memory(&create_engine(0.0)?)?.into_bands()?;
        let interpolated = run_to_memory(&create_engine(0.01)?)?.into_bands()?;

        // identical presence flags
        assert_eq!(exact[1], interpolated[1]);
        assert!(exact[1].contains(&1.0));

        for (i, (exact, interpolated)) in exact[0].iter().zip(&interpolated[0]).enumerate() {
            if *exact == NOD {
                assert_eq!(*interpolated, NOD, "pixel {i}");
            } else {
                assert_relative_eq!(*exact, *interpolated, epsilon = 0.05);
            }
        }

        Ok(())
    }

    #[test]
    fn engine_requires_a_slave() -> Result<()> {
        let master = testutils::memory_product("master", testutils::degree_grid(RasterSize::square(2), 0.0, 0.0), vec![])?;
        assert!(matches!(
            CollocationEngine::new(master, vec![], CollocationOptions::default()),
            Err(Error::InvalidArgument(_))
        ));
        Ok(())
    }

    #[cfg(feature = "rayon")]
    #[test_log::test]
    fn parallel_run_matches_sequential_run() -> Result<()> {
        use crate::NumThreads;

        let size = RasterSize::with_rows_cols(17, 23);
        let create_engine = |num_threads| -> Result<CollocationEngine> {
            let master = testutils::memory_product("master", testutils::degree_grid_with_cell_size(size, 0.3, 50.0, 0.9), vec![])?;
            let slave = testutils::memory_product(
                "slave",
                testutils::degree_grid(size, 0.0, 50.0),
                vec![(float_band("b1"), SampleData::from(ramp(size)))],
            )?;

            CollocationEngine::new(
                master,
                vec![slave],
                CollocationOptions {
                    resampling: ResamplingMethod::CubicConvolution,
                    tile_size: RasterSize::square(4),
                    num_threads,
                    ..Default::default()
                },
            )
        };

        let sequential = run_to_memory(&create_engine(NumThreads::Count(1))?)?.into_bands()?;
        let parallel = run_to_memory(&create_engine(NumThreads::Count(4))?)?.into_bands()?;
        assert_eq!(sequential, parallel);
        Ok(())
    }
}
