//! Evo Vector CLI - Create and vary genomes from a JSON species declaration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use evo_vector::{
    codec::format_genome,
    compute::{GenomeRng, VectorSpecies, create_population, genome_distance, vary_population},
    schema::{ElementKind, SpeciesDeclaration},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <species.json> [count] [seed]", args[0]);
        eprintln!();
        eprintln!("Create a population from a species declaration and apply one round of variation.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  species.json  Path to species declaration file");
        eprintln!("  count         Number of individuals (default: 10)");
        eprintln!("  seed          Random seed (default: from entropy)");
        eprintln!();
        eprintln!("Example declaration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_declaration();
        return;
    }

    let decl_path = PathBuf::from(&args[1]);
    let count: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);
    let seed: u64 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| GenomeRng::random().next_seed());

    // Load declaration
    let decl_str = fs::read_to_string(&decl_path).unwrap_or_else(|e| {
        eprintln!("Error reading species file: {}", e);
        std::process::exit(1);
    });

    let decl: SpeciesDeclaration = serde_json::from_str(&decl_str).unwrap_or_else(|e| {
        eprintln!("Error parsing species: {}", e);
        std::process::exit(1);
    });

    if decl.element == ElementKind::Gene {
        eprintln!("Opaque gene species need a prototype and cannot be run from the CLI");
        std::process::exit(1);
    }

    let species = VectorSpecies::setup(&decl).unwrap_or_else(|e| {
        eprintln!("Invalid species: {}", e);
        std::process::exit(1);
    });

    println!("Evo Vector");
    println!("==========");
    println!("Element: {}", species.element());
    match species.genome_size() {
        Some(size) => println!("Genome size: {}", size),
        None => println!("Genome size: {:?}", species.sizing()),
    }
    println!("Crossover: {}", species.crossover_kind());
    println!("Individuals: {}", count);
    println!("Seed: {}", seed);
    println!();

    let start = Instant::now();
    let parents = create_population(&species, count, seed);

    println!("Initial population:");
    for genome in &parents {
        println!("  {}", format_genome(genome));
    }
    println!();

    let mut offspring = parents.clone();
    let skipped = vary_population(&species, &mut offspring, seed.wrapping_add(1));
    let elapsed = start.elapsed();

    println!("After one round of variation:");
    for (parent, child) in parents.iter().zip(&offspring) {
        println!(
            "  {}  (distance {:.4})",
            format_genome(child),
            genome_distance(parent, child)
        );
    }
    println!();

    let notices = species.notices();
    println!("Pairs without crossover: {}", skipped);
    println!("Out-of-range retry limits reached: {}", notices.retry_limit_count());
    println!("Length mismatches: {}", notices.length_mismatch_count());
    println!("Intermediate caps reached: {}", notices.intermediate_cap_count());
    println!("Time: {:.3}ms", elapsed.as_secs_f64() * 1000.0);
}

fn print_example_declaration() {
    let decl = SpeciesDeclaration::default();

    println!("Example declaration (species.json):");
    match serde_json::to_string_pretty(&decl) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example: {}", e),
    }
}
