use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Base directory for config, dump and logs (defaults to the per-user data dir)
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Path to the JSON config file (overrides <base-dir>/config.json)
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Directory for carved classes (overrides <base-dir>/dump)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Scan a raw memory image instead of this process
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Chunk size, in KiB (capped at the maximum artifact size)
    #[arg(long)]
    pub chunk_size_kib: Option<usize>,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}

#[cfg(test)]
mod tests {
    use super::CliOptions;
    use clap::Parser;

    #[test]
    fn defaults_to_live_scan() {
        let opts = CliOptions::try_parse_from(["classcarve"]).expect("parse");
        assert!(opts.input.is_none());
        assert!(opts.base_dir.is_none());
        assert!(opts.output.is_none());
    }

    #[test]
    fn parses_image_and_output() {
        let opts = CliOptions::try_parse_from([
            "classcarve",
            "--input",
            "heap.raw",
            "-o",
            "out",
            "--chunk-size-kib",
            "64",
        ])
        .expect("parse");
        assert_eq!(opts.input.as_deref(), Some(std::path::Path::new("heap.raw")));
        assert_eq!(opts.output.as_deref(), Some(std::path::Path::new("out")));
        assert_eq!(opts.chunk_size_kib, Some(64));
    }

    #[test]
    fn rejects_unknown_flag() {
        assert!(CliOptions::try_parse_from(["classcarve", "--gpu"]).is_err());
    }
}
