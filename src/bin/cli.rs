// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! bsp-csg CLI

use anyhow::{anyhow, bail, Context, Result};
use bsp_csg::{Csg, CsgConfig, Primitive, ResultSnapshot};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use nalgebra::Point3;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bsp-csg")]
#[command(about = "BSP-tree CSG engine - boolean operations on generated solids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Worker threads for parallel stages (default: one per core)
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Operation {
    Union,
    Difference,
    Intersect,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine two solids
    Boolean {
        #[arg(long, value_enum)]
        op: Operation,

        /// Left operand, e.g. cube:0,0,0:1,1,1
        #[arg(long, value_parser = parse_shape)]
        a: Primitive,

        /// Right operand, e.g. sphere:1,1,1:0.8:24
        #[arg(long, value_parser = parse_shape)]
        b: Primitive,

        /// Print the resulting triangles as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run optimizer passes over a compiled solid
    Optimize {
        /// Solid to optimize, e.g. cylinder:0,0,0:1:2:32
        #[arg(long, value_parser = parse_shape)]
        shape: Primitive,

        /// Number of passes
        #[arg(short, long, default_value = "100")]
        passes: usize,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to size the worker pool")?;
    }

    let config = match &cli.config {
        Some(path) => CsgConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => CsgConfig::default(),
    };

    match cli.command {
        Commands::Boolean { op, a, b, json } => boolean_command(op, &a, &b, json, config),
        Commands::Optimize { shape, passes } => optimize_command(&shape, passes, config),
        Commands::Version => {
            println!("bsp-csg v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn parse_point(text: &str) -> Result<Point3<f64>> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid point '{text}'"))?;
    match values.as_slice() {
        &[x, y, z] => Ok(Point3::new(x, y, z)),
        _ => bail!("point '{text}' needs three coordinates"),
    }
}

fn parse_number<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| anyhow!("invalid {what} '{text}'"))
}

/// `cube:x0,y0,z0:x1,y1,z1`, `sphere:cx,cy,cz:r:segments` or
/// `cylinder:cx,cy,cz:r:h:segments`.
fn parse_shape(text: &str) -> Result<Primitive> {
    let parts: Vec<&str> = text.split(':').collect();
    match parts.as_slice() {
        ["cube", min, max] => Ok(Primitive::Cube {
            min: parse_point(min)?,
            max: parse_point(max)?,
        }),
        ["sphere", center, radius, segments] => Ok(Primitive::Sphere {
            center: parse_point(center)?,
            radius: parse_number(radius, "radius")?,
            segments: parse_number(segments, "segment count")?,
        }),
        ["cylinder", center, radius, height, segments] => Ok(Primitive::Cylinder {
            center: parse_point(center)?,
            radius: parse_number(radius, "radius")?,
            height: parse_number(height, "height")?,
            segments: parse_number(segments, "segment count")?,
        }),
        _ => bail!("unrecognised shape '{text}'"),
    }
}

#[derive(Serialize)]
struct TriangleJson {
    vertices: [[f64; 3]; 3],
    normal: [f64; 3],
}

#[derive(Serialize)]
struct ResultJson {
    operation: &'static str,
    polygons: usize,
    generation: u64,
    triangles: Vec<TriangleJson>,
}

fn to_json(operation: &'static str, polygons: usize, snapshot: &ResultSnapshot) -> ResultJson {
    ResultJson {
        operation,
        polygons,
        generation: snapshot.generation,
        triangles: snapshot
            .triangles
            .iter()
            .map(|t| TriangleJson {
                vertices: t.vertices.map(|v| [v.x, v.y, v.z]),
                normal: [t.plane.normal.x, t.plane.normal.y, t.plane.normal.z],
            })
            .collect(),
    }
}

fn boolean_command(
    op: Operation,
    a: &Primitive,
    b: &Primitive,
    json: bool,
    config: CsgConfig,
) -> Result<()> {
    let left = a.to_csg().with_config(config);
    let right = b.to_csg();

    let start = Instant::now();
    let (name, result) = match op {
        Operation::Union => ("union", left.union(&right)?),
        Operation::Difference => ("difference", left.difference(&right)?),
        Operation::Intersect => ("intersect", left.intersect(&right)?),
    };
    let elapsed = start.elapsed();

    let compiled = result.compile(0)?;
    let snapshot = compiled.raw();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&to_json(name, result.polygons().len(), &snapshot))?
        );
        return Ok(());
    }

    print_summary(name, &left, &right, &result, &snapshot);
    println!("  {} {:.2?}", "Time:".bright_black(), elapsed);
    Ok(())
}

fn print_summary(name: &str, a: &Csg, b: &Csg, result: &Csg, snapshot: &ResultSnapshot) {
    println!("{}", name.to_uppercase().bold());
    println!(
        "  {} {} / {}",
        "Input polygons:".bright_black(),
        a.polygons().len().to_string().cyan(),
        b.polygons().len().to_string().cyan()
    );
    println!(
        "  {} {}",
        "Result polygons:".bright_black(),
        result.polygons().len().to_string().cyan()
    );
    println!(
        "  {} {}",
        "Triangles:".bright_black(),
        snapshot.len().to_string().cyan()
    );
    if result.is_empty() {
        println!("  {}", "Result is empty".yellow());
    } else {
        let bounds = result.bounds();
        println!(
            "  {} [{:.3}, {:.3}, {:.3}] - [{:.3}, {:.3}, {:.3}]",
            "Bounds:".bright_black(),
            bounds.min.x,
            bounds.min.y,
            bounds.min.z,
            bounds.max.x,
            bounds.max.y,
            bounds.max.z
        );
    }
    println!("  {} {:.4}", "Surface area:".bright_black(), snapshot.area());
}

fn optimize_command(shape: &Primitive, passes: usize, config: CsgConfig) -> Result<()> {
    let mut config = config;
    config.optimizer.enabled = true;
    let solid = shape.to_csg().with_config(config);
    let compiled = solid.compile(0)?;
    let optimizer = compiled
        .optimizer()
        .ok_or_else(|| anyhow!("optimizer is not available"))?;

    let before = compiled.raw();
    let start = Instant::now();
    let changed = (0..passes).filter(|_| optimizer.step().changed).count();
    let elapsed = start.elapsed();
    let after = compiled.current();

    println!("{}", "OPTIMIZE".bold());
    println!(
        "  {} {} -> {}",
        "Triangles:".bright_black(),
        before.len().to_string().cyan(),
        after.len().to_string().cyan()
    );
    println!(
        "  {} {} of {}",
        "Changing passes:".bright_black(),
        changed.to_string().green(),
        passes
    );
    match compiled.progress() {
        Some(progress) => println!("  {} {:.1}%", "Progress rate:".bright_black(), progress.rate),
        None => println!("  {} {}", "Progress rate:".bright_black(), "idle".yellow()),
    }
    println!(
        "  {} {:.6} -> {:.6}",
        "Surface area:".bright_black(),
        before.area(),
        after.area()
    );
    println!("  {} {:.2?}", "Time:".bright_black(), elapsed);
    Ok(())
}
