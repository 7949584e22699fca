//! Greedy speciation of a population.

use crate::schema::{ReactorGenome, SpeciationConfig};

use super::fitness::EvaluatedGenome;
use super::genome::genome_similarity;

/// A cluster of similar genomes, by index into the clustered slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species {
    /// Founding member; new genomes are compared against it.
    pub representative: usize,
    pub members: Vec<usize>,
}

/// Cluster genomes in order: each joins the first species whose
/// representative is at least `similarity_threshold` similar, or founds a
/// new one.
pub fn speciate(genomes: &[&ReactorGenome], config: &SpeciationConfig) -> Vec<Species> {
    let mut species: Vec<Species> = Vec::new();
    for (index, genome) in genomes.iter().enumerate() {
        let home = species.iter_mut().find(|s| {
            genome_similarity(config, genomes[s.representative], genome)
                >= config.similarity_threshold
        });
        match home {
            Some(existing) => existing.members.push(index),
            None => species.push(Species {
                representative: index,
                members: vec![index],
            }),
        }
    }
    species
}

/// Best `n` genomes with at most one per species, highest fitness first.
pub fn top_distinct<'a>(
    population: &'a [EvaluatedGenome],
    config: &SpeciationConfig,
    n: usize,
) -> Vec<&'a EvaluatedGenome> {
    let mut ranked: Vec<&EvaluatedGenome> = population.iter().collect();
    ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

    let mut picked: Vec<&EvaluatedGenome> = Vec::with_capacity(n);
    for candidate in ranked {
        if picked.len() >= n {
            break;
        }
        let distinct = picked.iter().all(|p| {
            genome_similarity(config, &p.genome, &candidate.genome) < config.similarity_threshold
        });
        if distinct {
            picked.push(candidate);
        }
    }
    picked
}
