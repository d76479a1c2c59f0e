use reg_gen::{compile, Generator, GeneratorConfig, LengthPolicy};
use std::error::Error;

/// Example of generating test data from a few field formats
fn main() -> Result<(), Box<dyn Error>> {
    // Example 1: one-off words straight from a pattern
    println!("Identifiers:");
    for seed in 0..5 {
        let word = reg_gen::generate("[a-z_][a-z0-9_]*", 10, Some(seed))?;
        println!("{}. {}", seed + 1, word.text);
    }

    // Example 2: compile once, sample many times
    let phone = compile(r"\d{3} \d{3} \d{4}")?;
    let generator = Generator::new(&phone)?;

    println!("\nPhone numbers:");
    for seed in 0..5 {
        let word = generator.generate(12, Some(seed))?;
        println!("{}. {}", seed + 1, word.text);
    }

    // Example 3: lengths the pattern cannot produce fall back to the nearest one
    let config = GeneratorConfig {
        length_policy: LengthPolicy::Closest,
        ..GeneratorConfig::default()
    };
    let generator = Generator::with_config("(ab)+", config)?;

    println!("\nNearest feasible lengths:");
    for length in [1, 4, 7] {
        let word = generator.generate(length, Some(7))?;
        println!("asked for {}, got {:?}", length, word.text);
    }

    Ok(())
}
