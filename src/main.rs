use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{value_parser, Arg, ArgAction, ArgGroup, Command, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixelgrid::adjust::grayscale;
use pixelgrid::grid::Tick;
use pixelgrid::{
    compute_grid, parse_color_count, render_grid, ColorType, Enhancement, GridColor, GridSpec,
    Params, PixelationSpec, Session,
};

#[derive(ValueEnum, Clone, Debug)]
enum ColorSpace {
    Lab,
    Rgb,
}

fn main() -> Result<(), Box<dyn Error>> {
    let matches = Command::new("pixelgrid")
        .version("0.1")
        .about("Trim, pixelate and grid an image for pixel-art reference sheets.")
        .arg(
            Arg::new("input")
                .help("Sets the input image to use")
                .required(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("params")
                .long("params")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Parameter file with save_path, init_offset, ... (one 'key value' per line)"),
        )
        .arg(
            Arg::new("auto_trim")
                .long("auto-trim")
                .value_name("THRESHOLD")
                .value_parser(value_parser!(f32))
                .help("Trim away the most common (background) color; differences above THRESHOLD are kept."),
        )
        .arg(
            Arg::new("xrange")
                .long("xrange")
                .value_name("(XMIN,XMAX)")
                .requires("yrange")
                .help("Manual trim: x range of the displayed image."),
        )
        .arg(
            Arg::new("yrange")
                .long("yrange")
                .value_name("(YMIN,YMAX)")
                .requires("xrange")
                .help("Manual trim: y range of the displayed image, measured from the bottom."),
        )
        .group(ArgGroup::new("trim").args(["auto_trim", "xrange"]).multiple(false))
        .arg(
            Arg::new("pixels")
                .short('n')
                .long("pixels")
                .value_name("UINT")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("50")
                .help("Number of cells along the longer side."),
        )
        .arg(
            Arg::new("colors")
                .short('k')
                .long("colors")
                .value_name("UINT")
                .help("Number of colors in the output. 2 gives a black/white image; leave out to keep all colors."),
        )
        .arg(
            Arg::new("color_space")
                .long("color_space")
                .short('c')
                .help("The color space the palette is clustered in.")
                .action(ArgAction::Set)
                .value_name("ColorSpace")
                .value_parser(value_parser!(ColorSpace))
                .default_value("lab"),
        )
        .arg(
            Arg::new("sharpness")
                .long("sharpness")
                .value_name("1-10")
                .value_parser(value_parser!(f32))
                .default_value("1.0")
                .help("Sharpness factor applied before pixelation."),
        )
        .arg(
            Arg::new("contrast")
                .long("contrast")
                .value_name("1-10")
                .value_parser(value_parser!(f32))
                .default_value("1.0")
                .help("Contrast factor applied before pixelation."),
        )
        .arg(
            Arg::new("grayscale")
                .long("grayscale")
                .action(ArgAction::SetTrue)
                .help("Export a grayscale copy of the pixelated image."),
        )
        .arg(
            Arg::new("grid")
                .long("grid")
                .action(ArgAction::SetTrue)
                .help("Draw gridlines on the exported image."),
        )
        .arg(
            Arg::new("spacing")
                .long("spacing")
                .value_name("UINT")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("1")
                .help("Cells between gridlines."),
        )
        .arg(
            Arg::new("thickness")
                .long("thickness")
                .value_name("FLOAT")
                .value_parser(value_parser!(f32))
                .default_value("1.0")
                .help("Gridline thickness in output pixels."),
        )
        .arg(
            Arg::new("grid_color")
                .long("grid-color")
                .value_name("COLOR")
                .default_value("black")
                .help("Gridline color: a name such as black/white/red or #rrggbb."),
        )
        .arg(
            Arg::new("offset")
                .long("offset")
                .value_name("FLOAT")
                .value_parser(value_parser!(f32))
                .help("Gridline and tick offset; defaults to init_offset from the parameter file."),
        )
        .arg(
            Arg::new("flip_x")
                .long("flip-x")
                .action(ArgAction::SetTrue)
                .help("Number the x axis from the right."),
        )
        .arg(
            Arg::new("cell_size")
                .long("cell-size")
                .value_name("PX")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("16")
                .help("Output pixels per cell when drawing the grid."),
        )
        .arg(
            Arg::new("save_prefix")
                .short('o')
                .long("save-prefix")
                .value_name("PREFIX")
                .help("Prefix for the output file name; defaults to save_path from the parameter file."),
        )
        .arg(
            Arg::new("info")
                .long("info")
                .action(ArgAction::SetTrue)
                .help("Print dimensions, color count and tick labels."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Prints debug information verbosely."),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if verbose {
                    "pixelgrid=debug".into()
                } else {
                    "pixelgrid=warn".into()
                }
            }),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let params = match matches.get_one::<PathBuf>("params") {
        Some(path) => Params::load(path)?,
        None => Params::default(),
    };

    let input_path = matches
        .get_one::<PathBuf>("input")
        .ok_or("missing input file")?;
    println!("Using input file: {}", input_path.display());
    let mut session = Session::open(input_path)?;

    if let Some(&threshold) = matches.get_one::<f32>("auto_trim") {
        if !session.auto_trim(threshold) {
            println!("Nothing to trim.");
        }
    } else if let (Some(x), Some(y)) = (
        matches.get_one::<String>("xrange"),
        matches.get_one::<String>("yrange"),
    ) {
        let applied = session.manual_trim_text(x, y);
        println!("Trimmed to x {}..{}, y {}..{}", applied.xmin, applied.xmax, applied.ymin, applied.ymax);
    }

    let target_cells = matches.get_one::<u32>("pixels").copied().unwrap_or(50);
    let color_count = matches
        .get_one::<String>("colors")
        .and_then(|text| parse_color_count(text));
    let enhancement = Enhancement::new(
        matches.get_one::<f32>("sharpness").copied().unwrap_or(1.0),
        matches.get_one::<f32>("contrast").copied().unwrap_or(1.0),
    );
    let color_type = match matches.get_one::<ColorSpace>("color_space") {
        Some(ColorSpace::Rgb) => ColorType::Rgb,
        _ => ColorType::Lab,
    };
    let spec = PixelationSpec::new(target_cells, color_count).with_color_type(color_type);
    let mut pixelated = session.pixelate(&spec, &enhancement);
    if matches.get_flag("grayscale") {
        pixelated = grayscale(&pixelated);
    }
    println!("Target size: {}x{}", pixelated.width(), pixelated.height());

    let grid_color = match matches.get_one::<String>("grid_color") {
        Some(text) => GridColor::parse(text).unwrap_or_else(|e| {
            tracing::warn!(%e, "Using black gridlines");
            GridColor::BLACK
        }),
        None => GridColor::BLACK,
    };
    let grid_spec = GridSpec {
        line_spacing: matches.get_one::<u32>("spacing").copied().unwrap_or(1),
        line_thickness: matches.get_one::<f32>("thickness").copied().unwrap_or(1.0),
        offset: matches
            .get_one::<f32>("offset")
            .copied()
            .unwrap_or(params.init_offset),
        color: grid_color,
        flip_x: matches.get_flag("flip_x"),
    };
    let geometry = compute_grid(pixelated.width(), pixelated.height(), &grid_spec)?;

    if matches.get_flag("info") {
        println!("Trimmed size: {}x{}", session.current().width(), session.current().height());
        println!("Color mode: {}", pixelated.color_mode());
        println!("Unique colors: {}", pixelated.unique_colors());
        println!("Color steps: {}", pixelated.color_step_baseline());
        println!("X labels: {}", format_ticks(&geometry.x_ticks));
        println!("Y labels: {}", format_ticks(&geometry.y_ticks));
    }

    let output = if matches.get_flag("grid") {
        let cell_px = matches.get_one::<u32>("cell_size").copied().unwrap_or(16);
        render_grid(&pixelated, &geometry, cell_px)?
    } else {
        pixelated
    };

    let prefix = matches
        .get_one::<String>("save_prefix")
        .cloned()
        .unwrap_or_else(|| params.save_path.clone());
    ensure_parent(&prefix)?;
    let path = session.save(&output, &prefix)?;
    println!("Figure saved to: {}", path.display());

    Ok(())
}

fn format_ticks(ticks: &[Tick]) -> String {
    ticks
        .iter()
        .map(|t| format!("{}@{}", t.label, t.position))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Create the directory part of a save prefix such as `out/` or `out/shot_`.
fn ensure_parent(prefix: &str) -> std::io::Result<()> {
    let dir = if prefix.ends_with(std::path::MAIN_SEPARATOR) || prefix.ends_with('/') {
        Path::new(prefix)
    } else {
        match Path::new(prefix).parent() {
            Some(parent) => parent,
            None => return Ok(()),
        }
    };
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
}
