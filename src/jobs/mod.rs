//! Tile jobs and the work queue that distributes them

mod queue;

pub use queue::{JobConsumer, JobProducer, QueueClosed, job_queue};

use std::path::{Path, PathBuf};

use crate::coord::{TileIndex, TileRange};
use crate::source::UrlTemplate;

/// One unit of fetch work: where a tile comes from and where its bytes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileJob {
    /// 1-based position in enumeration order
    pub seq: u64,
    pub index: TileIndex,
    pub zoom: u32,
    pub url: String,
    pub destination: PathBuf,
}

/// File name holding one downloaded tile, unique per (x, y, zoom).
pub fn tile_file_name(index: TileIndex, zoom: u32) -> String {
    format!("tile-{}_{}_{}.png", index.x, index.y, zoom)
}

/// Build one job per tile of `range`, in column-major order.
pub fn enumerate(range: &TileRange, template: &UrlTemplate, dir: &Path) -> Vec<TileJob> {
    let zoom = range.zoom();

    range
        .cells()
        .zip(1u64..)
        .map(|((_, _, index), seq)| TileJob {
            seq,
            index,
            zoom,
            url: template.render(index, zoom),
            destination: dir.join(tile_file_name(index, zoom)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn range_5_5_to_7_6() -> TileRange {
        TileRange::new(TileIndex::new(5, 5), TileIndex::new(7, 6), 4, 256).unwrap()
    }

    #[test]
    fn test_enumerates_every_tile_once() {
        let jobs = enumerate(
            &range_5_5_to_7_6(),
            &UrlTemplate::default(),
            Path::new("/tmp/run"),
        );

        assert_eq!(jobs.len(), 6);

        let indices: HashSet<_> = jobs.iter().map(|job| job.index).collect();
        let expected: HashSet<_> = [5, 6, 7]
            .into_iter()
            .flat_map(|x| [5, 6].into_iter().map(move |y| TileIndex::new(x, y)))
            .collect();
        assert_eq!(indices, expected);

        let destinations: HashSet<_> = jobs.iter().map(|job| job.destination.clone()).collect();
        assert_eq!(destinations.len(), 6);
    }

    #[test]
    fn test_job_fields() {
        let jobs = enumerate(
            &range_5_5_to_7_6(),
            &UrlTemplate::new("http://tiles.test/{z}/{x}/{y}"),
            Path::new("/tmp/run"),
        );

        let first = &jobs[0];
        assert_eq!(first.seq, 1);
        assert_eq!(first.index, TileIndex::new(5, 5));
        assert_eq!(first.zoom, 4);
        assert_eq!(first.url, "http://tiles.test/4/5/5");
        assert_eq!(first.destination, PathBuf::from("/tmp/run/tile-5_5_4.png"));

        // dy is the inner loop
        assert_eq!(jobs[1].index, TileIndex::new(5, 6));
        assert_eq!(jobs[5].seq, 6);
        assert_eq!(jobs[5].index, TileIndex::new(7, 6));
    }

    #[test]
    fn test_tile_file_name_keeps_sign() {
        assert_eq!(tile_file_name(TileIndex::new(-1, 3), 2), "tile--1_3_2.png");
    }
}
