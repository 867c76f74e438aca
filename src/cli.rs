use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tilestitch::config::{Config, FetchMode, MapConfig};
use tilestitch::coord::BoundingBox;
use tilestitch::source::UrlTemplate;

#[derive(Parser, Debug)]
#[command(name = "tilestitch")]
#[command(about = "Download map tiles covering a bounding box and stitch them into one image", long_about = None)]
pub struct Cli {
    /// Configuration file (default: config/tilestitch.toml or $TILESTITCH_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every tile of the bounding box and write the stitched map
    Fetch(FetchArgs),
    /// Show the tile range of a bounding box without downloading anything
    Plan(PlanArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Corners and grid parameters shared by `fetch` and `plan`
#[derive(clap::Args, Debug, Clone)]
pub struct BoxArgs {
    /// Latitude of the northwest corner, in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat_start: f64,

    /// Longitude of the northwest corner, in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lng_start: f64,

    /// Latitude of the southeast corner, in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat_end: f64,

    /// Longitude of the southeast corner, in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lng_end: f64,

    /// Zoom level [default: 12]
    #[arg(short, long)]
    pub zoom: Option<u32>,

    /// Tile edge length in pixels [default: 256]
    #[arg(long)]
    pub tile_size: Option<u32>,
}

impl BoxArgs {
    pub fn apply(&self, map: &mut MapConfig) {
        if let Some(zoom) = self.zoom {
            map.zoom = zoom;
        }
        if let Some(tile_size) = self.tile_size {
            map.tile_size = tile_size;
        }
    }

    pub fn bounding_box(&self, map: &MapConfig) -> BoundingBox {
        BoundingBox::new(self.lat_start, self.lng_start, self.lat_end, self.lng_end)
            .with_zoom(map.zoom)
            .with_tile_size(map.tile_size)
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub bbox: BoxArgs,

    /// Output image path; the extension selects the format (png, jpg)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Fetch one tile at a time instead of using a worker pool
    #[arg(long, conflicts_with = "workers")]
    pub sequential: bool,

    /// Number of concurrent fetch workers [default: CPU count]
    #[arg(long)]
    pub workers: Option<usize>,

    /// Tile URL template with {x}, {y} and {z} placeholders
    #[arg(long)]
    pub url_template: Option<String>,
}

impl FetchArgs {
    /// Layer command-line flags over the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        self.bbox.apply(&mut config.map);

        if self.sequential {
            config.fetch.mode = FetchMode::Sequential;
        }
        if let Some(workers) = self.workers {
            config.fetch.mode = FetchMode::Concurrent;
            config.fetch.workers = Some(workers);
        }
        if let Some(template) = &self.url_template {
            config.source.url_template = UrlTemplate::new(template.clone());
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub bbox: BoxArgs,

    /// Emit the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch_with_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "tilestitch",
            "fetch",
            "--lat-start",
            "-6.256524",
            "--lng-start",
            "107.170208",
            "--lat-end",
            "-6.292112",
            "--lng-end",
            "107.242934",
            "--zoom",
            "20",
            "-o",
            "lemanabang.png",
        ])
        .unwrap();

        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch command");
        };
        assert_eq!(args.bbox.lat_start, -6.256524);
        assert_eq!(args.bbox.zoom, Some(20));
        assert_eq!(args.bbox.tile_size, None);
        assert_eq!(args.output, PathBuf::from("lemanabang.png"));
        assert!(!args.sequential);
    }

    #[test]
    fn test_fetch_flags_override_config() {
        let cli = Cli::try_parse_from([
            "tilestitch",
            "--config",
            "custom.toml",
            "fetch",
            "--lat-start",
            "1",
            "--lng-start",
            "2",
            "--lat-end",
            "0",
            "--lng-end",
            "3",
            "--tile-size",
            "512",
            "--sequential",
            "--url-template",
            "http://127.0.0.1:1/{z}/{x}/{y}.png",
            "-o",
            "out.png",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch command");
        };

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.fetch.mode, FetchMode::Sequential);
        assert_eq!(config.map.tile_size, 512);
        assert_eq!(config.map.zoom, 12);
        assert_eq!(
            config.source.url_template.as_str(),
            "http://127.0.0.1:1/{z}/{x}/{y}.png"
        );

        let bbox = args.bbox.bounding_box(&config.map);
        assert_eq!(bbox.tile_size, 512);
        assert_eq!(bbox.lng_end, 3.0);
    }

    #[test]
    fn test_sequential_conflicts_with_workers() {
        let result = Cli::try_parse_from([
            "tilestitch",
            "fetch",
            "--lat-start",
            "1",
            "--lng-start",
            "2",
            "--lat-end",
            "0",
            "--lng-end",
            "3",
            "--sequential",
            "--workers",
            "4",
            "-o",
            "out.png",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn test_parse_plan_json() {
        let cli = Cli::try_parse_from([
            "tilestitch",
            "plan",
            "--lat-start",
            "1",
            "--lng-start",
            "-2",
            "--lat-end",
            "0",
            "--lng-end",
            "3",
            "--json",
        ])
        .unwrap();

        let Commands::Plan(args) = cli.command else {
            panic!("expected plan command");
        };
        assert!(args.json);
        assert_eq!(args.bbox.lng_start, -2.0);
    }
}
