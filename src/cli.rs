use crate::config::{SplineMode, load_config};
use crate::ir::Graph;
use crate::layout::generate_edges;
use crate::layout_dump::write_layout_dump;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "orthr", version, about = "Edge router for placed graphs")]
pub struct Args {
    /// Input graph (.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output layout dump (JSON). Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Edge style, overriding the config file
    #[arg(short = 's', long = "splines", value_enum)]
    pub splines: Option<SplinesArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplinesArg {
    Ortho,
    Line,
    Curved,
}

impl From<SplinesArg> for SplineMode {
    fn from(arg: SplinesArg) -> Self {
        match arg {
            SplinesArg::Ortho => SplineMode::Ortho,
            SplinesArg::Line => SplineMode::Line,
            SplinesArg::Curved => SplineMode::Curved,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    execute(&args)
}

fn execute(args: &Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(splines) = args.splines {
        config.splines = splines.into();
    }
    let input = read_input(args.input.as_deref())?;
    let graph = Graph::from_json5(&input)?;
    let layout = generate_edges(&graph, &config)?;
    write_layout_dump(args.output.as_deref(), &layout)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let args = Args::try_parse_from(["orthr", "-i", "graph.json5", "-s", "curved"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("graph.json5")));
        assert_eq!(args.splines, Some(SplinesArg::Curved));
        assert!(args.output.is_none());
        assert!(Args::try_parse_from(["orthr", "-s", "wavy"]).is_err());
    }

    #[test]
    fn writes_dump_for_input_file() {
        let dir = std::env::temp_dir().join(format!("orthr-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("graph.json5");
        let output = dir.join("layout.json");
        std::fs::write(
            &input,
            r#"{
                nodes: [
                    { id: "a", x: 0, y: 0, width: 2, height: 2 },
                    { id: "b", x: 10, y: 0, width: 2, height: 2 },
                ],
                edges: [{ from: "a", to: "b" }],
            }"#,
        )
        .unwrap();
        let args = Args {
            input: Some(input),
            output: Some(output.clone()),
            config: None,
            splines: Some(SplinesArg::Line),
        };
        execute(&args).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["edges"][0]["points"][0][0].as_f64(), Some(1.0));
        assert_eq!(written["edges"][0]["curved"], serde_json::Value::Bool(false));
        std::fs::remove_dir_all(&dir).ok();
    }
}
