//! Seed lists: known-good blueprints injected into generation zero.
//!
//! A seed file holds one blueprint code per line. Anything after `//` or
//! `#` is a comment, and blank lines are skipped.

use std::path::Path;

use crate::compute::{BlueprintCodec, BlueprintError, ComponentFactory, HexBlueprint};

use super::{GaConfig, GenomeError, ReactorGenome};

/// Seed file loading errors.
#[derive(Debug, thiserror::Error)]
pub enum SeedFileError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Line {line}: invalid blueprint: {source}")]
    Blueprint {
        line: usize,
        #[source]
        source: BlueprintError,
    },
    #[error("Line {line}: {source}")]
    Genome {
        line: usize,
        #[source]
        source: GenomeError,
    },
}

/// Drop the comment part of a line and surrounding whitespace.
fn strip_comment(line: &str) -> &str {
    let end = [line.find("//"), line.find('#')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    line[..end].trim()
}

/// Parse seed-list text into genomes, in file order.
pub fn parse_seed_list(
    text: &str,
    config: &GaConfig,
    factory: &dyn ComponentFactory,
) -> Result<Vec<ReactorGenome>, SeedFileError> {
    let codec = HexBlueprint::from_config(&config.reactor);
    let mut genomes = Vec::new();
    for (number, raw) in text.lines().enumerate() {
        let code = strip_comment(raw);
        if code.is_empty() {
            continue;
        }
        let line = number + 1;
        let reactor = codec
            .decode(code, factory)
            .map_err(|source| SeedFileError::Blueprint { line, source })?;
        let genome = ReactorGenome::from_reactor(config, &reactor)
            .map_err(|source| SeedFileError::Genome { line, source })?;
        genomes.push(genome);
    }
    Ok(genomes)
}

/// Read and parse a seed file.
pub fn load_seed_file(
    path: impl AsRef<Path>,
    config: &GaConfig,
    factory: &dyn ComponentFactory,
) -> Result<Vec<ReactorGenome>, SeedFileError> {
    let text = std::fs::read_to_string(path)?;
    let genomes = parse_seed_list(&text, config, factory)?;
    log::debug!("loaded {} seed genomes", genomes.len());
    Ok(genomes)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::compute::Catalog;
    use crate::schema::{EMPTY_GENE, FUEL_GENE};

    fn empty_cells(n: usize) -> String {
        "00".repeat(n)
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("  0102 // trailing"), "0102");
        assert_eq!(strip_comment("# whole line"), "");
        assert_eq!(strip_comment("0102#x//y"), "0102");
        assert_eq!(strip_comment("   "), "");
    }

    #[test]
    fn test_load_seed_file() {
        let config = GaConfig::default();
        let catalog = Catalog::default();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "// known layouts").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "020A{} # dual uranium", empty_cells(52)).unwrap();
        writeln!(file, "   # nothing here").unwrap();
        writeln!(file, "0A{}06", empty_cells(52)).unwrap();

        let genomes = load_seed_file(file.path(), &config, &catalog).unwrap();
        assert_eq!(genomes.len(), 2);

        assert_eq!(genomes[0].fuel_type, 2);
        assert_eq!(genomes[0].layout[0], FUEL_GENE);
        assert_eq!(genomes[0].layout[1], 10);
        assert_eq!(genomes[0].layout[2], EMPTY_GENE);

        assert_eq!(genomes[1].fuel_type, 6);
        assert_eq!(genomes[1].layout[0], 10);
        assert_eq!(genomes[1].layout[53], FUEL_GENE);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let config = GaConfig::default();
        let catalog = Catalog::default();
        let text = format!("// header\n{}\n0102\n", empty_cells(54));

        match parse_seed_list(&text, &config, &catalog) {
            Err(SeedFileError::Blueprint { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let config = GaConfig::default();
        let catalog = Catalog::default();
        assert!(matches!(
            load_seed_file("/nonexistent/seeds.txt", &config, &catalog),
            Err(SeedFileError::Io(_))
        ));
    }
}
