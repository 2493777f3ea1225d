use clap::{Parser, Subcommand};
use noise_profile::{
    io::{
        read_buildings_geojson, read_ground_effects_geojson, read_scene_json, write_scene_json,
        SceneDescription,
    },
    Point3, Scene,
};

fn load_scene(path: &str, chord_length: Option<f64>) -> noise_profile::Result<Scene> {
    let mut description = read_scene_json(path)?;
    if let Some(length) = chord_length {
        description.config.max_chord_length = length;
    }
    description.into_builder()?.finish()
}

fn print_summary(scene: &Scene) {
    println!("Buildings: {}", scene.building_count());
    println!("Walls: {}", scene.walls().len());
    println!("Terrain triangles: {}", scene.terrain().triangles.len());
    println!("Ground effects: {}", scene.ground_effects().len());
    println!("Sources: {}", scene.sources().len());
    println!("Receivers: {}", scene.receivers().len());
    if let Some(env) = scene.envelope() {
        println!(
            "Envelope: {:.3},{:.3} {:.3},{:.3}",
            env.min_x, env.min_y, env.max_x, env.max_y
        );
    }
}

/// Command line interface for acoustic cut profiles.
#[derive(Parser)]
#[command(name = "noise_profile_cli", version)]
struct Cli {
    /// Override the chord length used to split rays for index queries
    #[arg(long, global = true)]
    chord_length: Option<f64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cut profile between a source and a receiver.
    #[command(allow_negative_numbers = true)]
    Profile {
        scene: String,
        sx: f64,
        sy: f64,
        sz: f64,
        rx: f64,
        ry: f64,
        rz: f64,
        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the terrain elevation at a point.
    #[command(allow_negative_numbers = true)]
    Elevation { scene: String, x: f64, y: f64 },
    /// Print the content counts of a scene.
    Summary { scene: String },
    /// Build a scene description from GeoJSON layers.
    ImportGeojson {
        output: String,
        /// Polygon features with optional height, id and absorption properties
        #[arg(long)]
        buildings: Option<String>,
        /// Polygon features with a coefficient property
        #[arg(long)]
        ground: Option<String>,
        /// Height of buildings without a height property
        #[arg(long, default_value_t = 10.0)]
        height: f64,
    },
}

fn run(cli: Cli) -> noise_profile::Result<()> {
    match cli.command {
        Commands::Profile {
            scene,
            sx,
            sy,
            sz,
            rx,
            ry,
            rz,
            json,
        } => {
            let scene = load_scene(&scene, cli.chord_length)?;
            let profile = scene.profile(Point3::new(sx, sy, sz), Point3::new(rx, ry, rz));
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                for point in &profile {
                    println!("{}", point);
                }
            }
        }
        Commands::Elevation { scene, x, y } => {
            let scene = load_scene(&scene, cli.chord_length)?;
            match scene.ground_elevation(x, y) {
                Some(z) => println!("Elevation: {:.3}", z),
                None => println!("No terrain at {:.3},{:.3}", x, y),
            }
        }
        Commands::Summary { scene } => {
            let scene = load_scene(&scene, cli.chord_length)?;
            print_summary(&scene);
        }
        Commands::ImportGeojson {
            output,
            buildings,
            ground,
            height,
        } => {
            let mut description = SceneDescription::new();
            if let Some(length) = cli.chord_length {
                description.config.max_chord_length = length;
            }
            if let Some(path) = buildings {
                description.buildings = read_buildings_geojson(&path, height)?;
            }
            if let Some(path) = ground {
                description.ground_effects = read_ground_effects_geojson(&path)?;
            }
            write_scene_json(&output, &description)?;
            println!(
                "Wrote {} buildings and {} ground effects to {}",
                description.buildings.len(),
                description.ground_effects.len(),
                output
            );
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env().init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
