use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stencil::generate::{self, DEFAULT_DESTINATION_SUFFIX, GenerateOptions};
use stencil::output;
use stencil::scan::{self, RunConfig};

#[derive(Parser)]
#[command(name = "stencil")]
#[command(about = "Build-context generator for templated container image families")]
#[command(long_about = "\
Build-context generator for templated container image families

One source tree fans out into N concrete build contexts. Directories with an
`.in` suffix are templates for a whole family of images; their `template.ini`
declares the family members and the values each one renders with.

Source structure:

  images/
  ├── php.in/                      # Templated source tree
  │   ├── template.ini             # [image.php80] php_version = 8.0
  │   │                            # [image.php81] php_version = 8.1
  │   ├── Dockerfile.j2            # Rendered once per declared variant
  │   ├── entrypoint.sh            # Static files are copied verbatim
  │   └── conf/
  │       └── www.conf.j2          # Templates can live at any depth
  └── redis.in/
      ├── template.ini
      └── Dockerfile.j2

Generated output (one directory per variant):

  out/
  ├── php80.generated/             # Dockerfile rendered with php_version=8.0
  ├── php81.generated/
  └── redis7.generated/

Output trees are deployable build contexts: no template.ini, no .j2 files,
every template replaced by its rendered, suffix-stripped counterpart. The
reserved variable `image_name` always holds the variant name.")]
#[command(version)]
struct Cli {
    /// Directory containing templated source trees
    #[arg(long, default_value = "images", global = true)]
    source: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render every declared variant into the output directory
    Generate(GenerateArgs),
    /// Show the expansion plan without writing anything
    List(ListArgs),
    /// Validate declaration files without touching the output filesystem
    Check,
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Output directory
    #[arg(long, short = 'o', value_name = "DIR")]
    output: PathBuf,

    /// Remove and rebuild destinations that already exist
    #[arg(long, short = 'f')]
    force: bool,

    /// Suffix appended to every destination directory name
    #[arg(long, default_value = DEFAULT_DESTINATION_SUFFIX)]
    suffix: String,

    /// Comma-separated allow-list of variant names (default: all)
    #[arg(long, value_delimiter = ',', value_name = "NAME")]
    only: Option<Vec<String>>,
}

#[derive(clap::Args)]
struct ListArgs {
    /// Output directory (used to compute destinations)
    #[arg(long, short = 'o', value_name = "DIR")]
    output: PathBuf,

    /// Emit the plan as JSON instead of the tree display
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => {
            let config = RunConfig {
                images_dir: cli.source,
                output_dir: args.output,
            };
            let options = GenerateOptions {
                only: args.only.map(|names| names.into_iter().collect()),
                suffix: args.suffix,
                force: args.force,
            };
            let report = generate::generate(&config, &options)?;
            output::print_report(&report, &config.images_dir);
        }
        Command::List(args) => {
            let config = RunConfig {
                images_dir: cli.source,
                output_dir: args.output,
            };
            let images = scan::enumerate_images(&config)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&images)?);
            } else {
                output::print_plan(&images, &config.images_dir);
            }
        }
        Command::Check => {
            let mut trees = Vec::new();
            for tree in scan::find_source_trees(&cli.source)? {
                let variants = scan::parse_declaration(&tree)?;
                trees.push((tree, variants));
            }
            trees.sort_by(|a, b| a.0.cmp(&b.0));
            output::print_check(&trees, &cli.source);
            println!("Declarations are valid");
        }
    }

    Ok(())
}
