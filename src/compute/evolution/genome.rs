//! Genome operations for the layout search.
//!
//! Provides random generation, crossover, mutation, similarity, and
//! conversion between genomes and reactor grids.

use rand::prelude::*;

use crate::compute::{ComponentFactory, Reactor};
use crate::schema::{
    EMPTY_GENE, FUEL_GENE, GaConfig, GenomeError, MutationProbabilities, MutationStats,
    ReactorGenome, SpeciationConfig,
};

/// Source of the two kinds of random draws genome operations make.
pub trait Dice {
    /// Uniform value in `[0, 1)`.
    fn roll(&mut self) -> f64;

    /// Uniform index in `[0, bound)`.
    fn pick(&mut self, bound: usize) -> usize;
}

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

}

impl Dice for GenomeRng {
    fn roll(&mut self) -> f64 {
        self.rng.r#gen()
    }

    fn pick(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0, "pick from an empty range");
        self.rng.gen_range(0..bound.max(1))
    }
}

impl ReactorGenome {
    /// Uniformly random genome: one fuel draw, then one draw per cell.
    pub fn random<D: Dice + ?Sized>(config: &GaConfig, dice: &mut D) -> Self {
        let fuels = &config.fuels.valid;
        let components = &config.components.valid;
        let fuel_type = fuels[dice.pick(fuels.len())];
        let layout = (0..config.genome_len())
            .map(|_| components[dice.pick(components.len())])
            .collect();
        Self { fuel_type, layout }
    }

    /// Read a reactor grid row by row.
    ///
    /// Every fuel-bearing cell becomes [`FUEL_GENE`]; the first one fixes
    /// the fuel type. A reactor without fuel gets the first configured fuel.
    pub fn from_reactor(config: &GaConfig, reactor: &Reactor) -> Result<Self, GenomeError> {
        if reactor.rows() != config.reactor.rows || reactor.cols() != config.reactor.cols {
            return Err(GenomeError::DimensionMismatch {
                rows: reactor.rows(),
                cols: reactor.cols(),
                expected_rows: config.reactor.rows,
                expected_cols: config.reactor.cols,
            });
        }

        let mut fuel_type = None;
        let layout = (0..reactor.cell_count())
            .map(|index| match reactor.component(index) {
                None => EMPTY_GENE,
                Some(component) if component.rod_count() > 0 => {
                    fuel_type.get_or_insert(component.id());
                    FUEL_GENE
                }
                Some(component) => component.id(),
            })
            .collect();

        let fuel_type = fuel_type
            .or_else(|| config.fuels.valid.first().copied())
            .unwrap_or(EMPTY_GENE);
        Ok(Self { fuel_type, layout })
    }

    /// Build the reactor this genome describes.
    pub fn to_reactor(
        &self,
        config: &GaConfig,
        factory: &dyn ComponentFactory,
    ) -> Result<Reactor, GenomeError> {
        let expected = config.genome_len();
        if self.layout.len() != expected {
            return Err(GenomeError::WrongLength {
                expected,
                actual: self.layout.len(),
            });
        }

        let mut reactor = Reactor::from_config(&config.reactor);
        for (index, &gene) in self.layout.iter().enumerate() {
            if gene == EMPTY_GENE {
                continue;
            }
            let id = if gene == FUEL_GENE { self.fuel_type } else { gene };
            let (row, col) = reactor.position(index);
            reactor.place(row, col, factory.create(id)?);
        }
        Ok(reactor)
    }

    /// Two-point crossover: the span between the cut points comes from `b`.
    pub fn cross_breed<D: Dice + ?Sized>(a: &Self, b: &Self, dice: &mut D) -> Self {
        let fuel_type = if dice.roll() < 0.5 {
            a.fuel_type
        } else {
            b.fuel_type
        };

        let len = a.layout.len();
        let first = dice.pick(len);
        let second = dice.pick(len);
        let (start, end) = (first.min(second), first.max(second));

        let layout = a
            .layout
            .iter()
            .zip(&b.layout)
            .enumerate()
            .map(|(i, (&gene_a, &gene_b))| {
                if (start..end).contains(&i) {
                    gene_b
                } else {
                    gene_a
                }
            })
            .collect();
        Self { fuel_type, layout }
    }

    /// Apply the three mutation channels in order: fuel, single cell, per slot.
    pub fn try_mutation<D: Dice + ?Sized>(
        &mut self,
        config: &GaConfig,
        probabilities: &MutationProbabilities,
        dice: &mut D,
        stats: &mut MutationStats,
    ) {
        let fuels = &config.fuels.valid;
        let components = &config.components.valid;
        stats.attempts += 1;

        if dice.roll() < probabilities.fuel {
            self.fuel_type = fuels[dice.pick(fuels.len())];
            stats.fuel += 1;
        }

        if dice.roll() < probabilities.layout {
            let index = dice.pick(self.layout.len());
            self.layout[index] = components[dice.pick(components.len())];
            stats.single_cell += 1;
        }

        if probabilities.layout_per_slot > 0.0 {
            for gene in &mut self.layout {
                if dice.roll() < probabilities.layout_per_slot {
                    *gene = components[dice.pick(components.len())];
                    stats.per_slot += 1;
                }
            }
        }
    }
}

/// Similarity of two genomes in `[0, 1]`.
///
/// Genomes with different fuel types are unrelated. Otherwise the score
/// blends the Jaccard index of their fuel cells with the fraction of
/// matching genes among cells that are not fuel in both.
pub fn genome_similarity(config: &SpeciationConfig, a: &ReactorGenome, b: &ReactorGenome) -> f64 {
    if a.fuel_type != b.fuel_type {
        return 0.0;
    }
    debug_assert_eq!(a.layout.len(), b.layout.len());

    let mut intersection = 0usize;
    let mut union = 0usize;
    let mut matching = 0usize;
    let mut relevant = 0usize;
    for (&gene_a, &gene_b) in a.layout.iter().zip(&b.layout) {
        let fuel_a = gene_a == FUEL_GENE;
        let fuel_b = gene_b == FUEL_GENE;
        if fuel_a || fuel_b {
            union += 1;
        }
        if fuel_a && fuel_b {
            intersection += 1;
            continue;
        }
        relevant += 1;
        if gene_a == gene_b {
            matching += 1;
        }
    }

    let fuel_score = if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    };
    let layout_score = if relevant == 0 {
        1.0
    } else {
        matching as f64 / relevant as f64
    };

    (fuel_score * config.fuel_layout_weight + layout_score * config.components_layout_weight)
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::compute::Catalog;
    use proptest::prelude::*;

    /// Dice that replays fixed sequences.
    #[derive(Default)]
    struct ScriptedDice {
        rolls: VecDeque<f64>,
        picks: VecDeque<usize>,
    }

    impl ScriptedDice {
        fn new(rolls: &[f64], picks: &[usize]) -> Self {
            Self {
                rolls: rolls.iter().copied().collect(),
                picks: picks.iter().copied().collect(),
            }
        }

        fn is_exhausted(&self) -> bool {
            self.rolls.is_empty() && self.picks.is_empty()
        }
    }

    impl Dice for ScriptedDice {
        fn roll(&mut self) -> f64 {
            self.rolls.pop_front().expect("roll queue is empty")
        }

        fn pick(&mut self, bound: usize) -> usize {
            let value = self.picks.pop_front().expect("pick queue is empty");
            assert!(value < bound, "scripted pick {value} out of range {bound}");
            value
        }
    }

    fn filled(config: &GaConfig, gene: i32) -> ReactorGenome {
        ReactorGenome {
            fuel_type: config.fuels.valid[0],
            layout: vec![gene; config.genome_len()],
        }
    }

    #[test]
    fn test_random_genome() {
        let config = GaConfig::default();
        let mut rng = GenomeRng::new(42);
        let genome = ReactorGenome::random(&config, &mut rng);

        assert_eq!(genome.layout.len(), 54);
        assert!(config.fuels.valid.contains(&genome.fuel_type));
        assert!(genome.layout.iter().all(|g| config.components.valid.contains(g)));
    }

    #[test]
    fn test_random_is_seed_reproducible() {
        let config = GaConfig::default();
        let a = ReactorGenome::random(&config, &mut GenomeRng::new(7));
        let b = ReactorGenome::random(&config, &mut GenomeRng::new(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_cross_breed_takes_span_from_second_parent() {
        let config = GaConfig::default();
        let a = filled(&config, 1);
        let mut b = filled(&config, 2);
        b.fuel_type = 4;

        let mut dice = ScriptedDice::new(&[0.99], &[25, 10]);
        let child = ReactorGenome::cross_breed(&a, &b, &mut dice);

        assert_eq!(child.fuel_type, 4);
        for (i, &gene) in child.layout.iter().enumerate() {
            let expected = if (10..25).contains(&i) { 2 } else { 1 };
            assert_eq!(gene, expected, "gene {i}");
        }
        assert!(dice.is_exhausted());
    }

    #[test]
    fn test_mutation_below_every_threshold_changes_nothing() {
        let config = GaConfig::default();
        let mut genome = ReactorGenome::random(&config, &mut GenomeRng::new(3));
        let original = genome.clone();

        let rolls = vec![0.99; config.genome_len() + 2];
        let mut dice = ScriptedDice::new(&rolls, &[]);
        let mut stats = MutationStats::default();
        genome.try_mutation(&config, &config.mutation.refinement, &mut dice, &mut stats);

        assert_eq!(genome, original);
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.total(), 0);
        assert!(dice.is_exhausted());
    }

    #[test]
    fn test_single_cell_mutation() {
        let config = GaConfig::default();
        let mut genome = filled(&config, 0);
        let probabilities = config.mutation.refinement;

        let mut rolls = vec![0.99; config.genome_len() + 2];
        rolls[1] = probabilities.layout / 2.0;
        let mut dice = ScriptedDice::new(&rolls, &[20, 5]);
        let mut stats = MutationStats::default();
        genome.try_mutation(&config, &probabilities, &mut dice, &mut stats);

        assert_eq!(genome.fuel_type, config.fuels.valid[0]);
        for (i, &gene) in genome.layout.iter().enumerate() {
            let expected = if i == 20 { config.components.valid[5] } else { 0 };
            assert_eq!(gene, expected, "gene {i}");
        }
        assert_eq!(stats.single_cell, 1);
    }

    #[test]
    fn test_per_slot_mutation() {
        let config = GaConfig::default();
        let mut genome = filled(&config, 0);
        let probabilities = config.mutation.exploration;

        let mut rolls = vec![0.99; config.genome_len() + 2];
        rolls[10 + 2] = probabilities.layout_per_slot / 2.0;
        rolls[35 + 2] = probabilities.layout_per_slot / 2.0;
        let mut dice = ScriptedDice::new(&rolls, &[2, 4]);
        let mut stats = MutationStats::default();
        genome.try_mutation(&config, &probabilities, &mut dice, &mut stats);

        for (i, &gene) in genome.layout.iter().enumerate() {
            let expected = match i {
                10 => config.components.valid[2],
                35 => config.components.valid[4],
                _ => 0,
            };
            assert_eq!(gene, expected, "gene {i}");
        }
        assert_eq!(stats.per_slot, 2);
        assert!(dice.is_exhausted());
    }

    #[test]
    fn test_fuel_mutation() {
        let config = GaConfig::default();
        let mut genome = filled(&config, 0);
        let probabilities = config.mutation.refinement;
        let last = config.fuels.valid.len() - 1;

        let mut rolls = vec![0.99; config.genome_len() + 2];
        rolls[0] = probabilities.fuel / 2.0;
        let mut dice = ScriptedDice::new(&rolls, &[last]);
        let mut stats = MutationStats::default();
        genome.try_mutation(&config, &probabilities, &mut dice, &mut stats);

        assert_eq!(genome.fuel_type, config.fuels.valid[last]);
        assert!(genome.layout.iter().all(|&g| g == 0));
        assert_eq!(stats.fuel, 1);
    }

    #[test]
    fn test_reactor_conversion_round_trip() {
        let config = GaConfig::default();
        let catalog = Catalog::default();
        let mut reactor = Reactor::from_config(&config.reactor);
        reactor.place(0, 0, catalog.create(2).unwrap());
        reactor.place(0, 1, catalog.create(10).unwrap());
        reactor.place(3, 4, catalog.create(2).unwrap());
        reactor.place(5, 8, catalog.create(21).unwrap());

        let genome = ReactorGenome::from_reactor(&config, &reactor).unwrap();
        assert_eq!(genome.fuel_type, 2);
        assert_eq!(genome.fuel_cell_count(), 2);
        assert_eq!(genome.layout[1], 10);
        assert_eq!(genome.layout[2], EMPTY_GENE);

        let rebuilt = genome.to_reactor(&config, &catalog).unwrap();
        assert_eq!(ReactorGenome::from_reactor(&config, &rebuilt).unwrap(), genome);
        assert_eq!(rebuilt.component_at(3, 4).unwrap().id(), 2);
    }

    #[test]
    fn test_conversion_errors() {
        let config = GaConfig::default();
        let catalog = Catalog::default();

        assert!(matches!(
            ReactorGenome::from_reactor(&config, &Reactor::new(3, 3)),
            Err(GenomeError::DimensionMismatch { rows: 3, .. })
        ));

        let short = ReactorGenome {
            fuel_type: 1,
            layout: vec![EMPTY_GENE; 10],
        };
        assert!(matches!(
            short.to_reactor(&config, &catalog),
            Err(GenomeError::WrongLength {
                expected: 54,
                actual: 10
            })
        ));

        let mut unknown = filled(&config, EMPTY_GENE);
        unknown.layout[0] = 77;
        assert!(matches!(
            unknown.to_reactor(&config, &catalog),
            Err(GenomeError::Factory(_))
        ));
    }

    #[test]
    fn test_similarity() {
        let speciation = SpeciationConfig {
            similarity_threshold: 0.9,
            fuel_layout_weight: 0.9,
            components_layout_weight: 0.1,
        };
        let config = GaConfig::default();
        let mut a = filled(&config, 9);
        a.layout[0] = FUEL_GENE;
        a.layout[1] = FUEL_GENE;

        assert!((genome_similarity(&speciation, &a, &a) - 1.0).abs() < 1e-9);

        let mut other_fuel = a.clone();
        other_fuel.fuel_type = 4;
        assert_eq!(genome_similarity(&speciation, &a, &other_fuel), 0.0);

        // One shared fuel cell out of three, half the other cells differ.
        let mut b = a.clone();
        b.layout[1] = 9;
        b.layout[2] = FUEL_GENE;
        for gene in b.layout.iter_mut().skip(3).step_by(2) {
            *gene = 10;
        }
        let relevant = 53.0;
        let differing = 2.0 + b.layout.iter().skip(3).step_by(2).count() as f64;
        let expected = 0.9 / 3.0 + 0.1 * (relevant - differing) / relevant;
        assert!((genome_similarity(&speciation, &a, &b) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_without_fuel_or_relevant_cells() {
        let speciation = SpeciationConfig::default();
        let config = GaConfig::default();
        let empty = filled(&config, EMPTY_GENE);
        // No fuel anywhere: full fuel score, every cell matches.
        assert!((genome_similarity(&speciation, &empty, &empty) - 1.0).abs() < 1e-9);

        let all_fuel = filled(&config, FUEL_GENE);
        // All fuel: full fuel score, no cells left to disagree on.
        assert!((genome_similarity(&speciation, &all_fuel, &all_fuel) - 1.0).abs() < 1e-9);

        let mut one_apart = all_fuel.clone();
        one_apart.layout[0] = EMPTY_GENE;
        let expected = speciation.fuel_layout_weight * 53.0 / 54.0;
        assert!((genome_similarity(&speciation, &all_fuel, &one_apart) - expected).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn test_similarity_is_bounded_and_symmetric(seed_a in any::<u64>(), seed_b in any::<u64>()) {
            let config = GaConfig::default();
            let a = ReactorGenome::random(&config, &mut GenomeRng::new(seed_a));
            let mut b = ReactorGenome::random(&config, &mut GenomeRng::new(seed_b));
            b.fuel_type = a.fuel_type;

            let ab = genome_similarity(&config.speciation, &a, &b);
            let ba = genome_similarity(&config.speciation, &b, &a);
            prop_assert!((0.0..=1.0).contains(&ab));
            prop_assert!((ab - ba).abs() < 1e-12);
        }

        #[test]
        fn test_self_similarity_is_one(
            seed in any::<u64>(),
            fill in prop::option::of(prop_oneof![Just(FUEL_GENE), Just(EMPTY_GENE)]),
            weight in 0.0f64..=1.0,
        ) {
            let config = GaConfig::default();
            let genome = match fill {
                Some(gene) => filled(&config, gene),
                None => ReactorGenome::random(&config, &mut GenomeRng::new(seed)),
            };
            let speciation = SpeciationConfig {
                fuel_layout_weight: weight,
                components_layout_weight: 1.0 - weight,
                ..SpeciationConfig::default()
            };
            let similarity = genome_similarity(&speciation, &genome, &genome);
            prop_assert!((similarity - 1.0).abs() < 1e-9, "similarity {}", similarity);
        }

        #[test]
        fn test_text_codec_round_trip(seed in any::<u64>()) {
            let config = GaConfig::default();
            let genome = ReactorGenome::random(&config, &mut GenomeRng::new(seed));
            let decoded: ReactorGenome = genome.to_string().parse().unwrap();
            prop_assert_eq!(decoded, genome);
        }
    }
}
