// Whole-piece structure planning.
//
// A piece is an ordered run of sections: a layered intro, a handful of
// interior sections, and an outro that fades to silence. Before any section
// is built the composer fixes the piece-wide choices: a wave character per
// instrument kind, a global tempo and a global tonic.
//
// Interior sections draw a small id. If an earlier section already carries
// that id, the newest such section is duplicated, given fresh dynamics and
// complexified, which is what produces recognisable reprises. Otherwise the
// section is built fresh around a subordinate tonic taken from the global
// tonic's scale. The scan is sequential because each decision depends on all
// earlier slots.
//
// The intro introduces instruments one at a time: one kind enters at once and
// every other kind enters after a random whole number of measures, playing
// the tail of the same progression. The outro has everyone enter together and
// its end dynamic is always zero.
//
// Depends on progression.rs for harmony and on an `InstrumentFactory`
// (instrument.rs) for the parts themselves.

use crate::choice::choose_uniform;
use crate::chord::{Chord, ChordType};
use crate::config::{ComposerConfig, MeasureRange};
use crate::error::ComposeError;
use crate::instrument::{Instrument, InstrumentFactory, InstrumentKind, PartRequest, PatternFactory, Wave};
use crate::progression::{ChordProgression, HarmonicGenerator};
use crate::section::{Section, Time};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wavesong_prng::GameRng;

/// A composed piece, ready to hand to a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub sections: Vec<Section>,
    pub waves: BTreeMap<InstrumentKind, Wave>,
    pub seconds_per_beat: f64,
    pub tonic: Chord,
}

impl Piece {
    pub fn duration_seconds(&self) -> f64 {
        self.sections.iter().map(Section::duration_seconds).sum()
    }

    /// One line per section: id, meter, tempo, dynamics and part entrances.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "tonic {:.1} Hz {:?}, {:.3} s/beat, {} sections, {:.0}s\n",
            self.tonic.root_hz(),
            self.tonic.chord_type(),
            self.seconds_per_beat,
            self.sections.len(),
            self.duration_seconds()
        );
        for (i, section) in self.sections.iter().enumerate() {
            let t = &section.time;
            out.push_str(&format!(
                "{i:>3}: id {:>3}  {}/{} x{:<2} {:.3} s/beat  vol {:>3}->{:<3} ",
                section.id,
                t.beats_per_measure,
                t.subdivisions_per_beat(),
                t.num_measures,
                t.seconds_per_beat,
                section.start_volume,
                section.end_volume
            ));
            for part in &section.parts {
                out.push_str(&format!(
                    " {:?}+{}",
                    part.instrument.kind, part.delay_measures
                ));
            }
            out.push('\n');
        }
        out
    }
}

/// Piece-wide decisions shared by every section builder.
struct Globals {
    waves: BTreeMap<InstrumentKind, Wave>,
    seconds_per_beat: f64,
    tonic: Chord,
}

/// Plans and assembles a whole piece from a single seed.
pub struct StructureComposer<F: InstrumentFactory = PatternFactory> {
    config: ComposerConfig,
    rng: GameRng,
    factory: F,
}

impl StructureComposer<PatternFactory> {
    /// A composer using the stock `PatternFactory`, seeded from the same
    /// stream. Rejects an invalid config up front.
    pub fn new(seed: u64, config: ComposerConfig) -> Result<Self, ComposeError> {
        let mut rng = GameRng::new(seed);
        let factory = PatternFactory::new(rng.fork());
        Self::from_parts(config, rng, factory)
    }
}

impl<F: InstrumentFactory> StructureComposer<F> {
    pub fn with_factory(seed: u64, config: ComposerConfig, factory: F) -> Result<Self, ComposeError> {
        Self::from_parts(config, GameRng::new(seed), factory)
    }

    fn from_parts(config: ComposerConfig, rng: GameRng, factory: F) -> Result<Self, ComposeError> {
        config.validate()?;
        Ok(StructureComposer { config, rng, factory })
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn compose(&mut self) -> Result<Piece, ComposeError> {
        let mut waves = BTreeMap::new();
        for kind in InstrumentKind::ALL {
            waves.insert(kind, *choose_uniform(&Wave::ALL, &mut self.rng)?);
        }

        let seconds_per_beat = self.draw_tempo();
        let tonic_hz = self.config.tonic_hz_min + self.rng.uniform(self.config.tonic_hz_span as usize) as u32;
        let tonic = Chord::new(tonic_hz as f64, *choose_uniform(&ChordType::ALL, &mut self.rng)?);
        let globals = Globals {
            waves,
            seconds_per_beat,
            tonic,
        };

        let num_sections = self
            .rng
            .range_usize_inclusive(self.config.min_sections, self.config.max_sections);
        debug!(
            "planning {num_sections} sections around {:.0} Hz {:?} at {seconds_per_beat:.3} s/beat",
            globals.tonic.root_hz(),
            globals.tonic.chord_type()
        );

        let mut sections = Vec::with_capacity(num_sections);
        sections.push(self.intro(&globals)?);

        let theme_bound = self.config.max_theme_id(num_sections) as usize + 1;
        for slot in 1..num_sections - 1 {
            let id = self.rng.uniform(theme_bound) as u32;
            let section = match sections.iter().rev().find(|s| s.id == id) {
                Some(earlier) => {
                    debug!("slot {slot}: reprise of id {id}");
                    let mut reprise = earlier.duplicate();
                    self.randomize_dynamics(&mut reprise);
                    reprise.complexify(&mut self.rng);
                    reprise
                }
                None => {
                    debug!("slot {slot}: fresh section id {id}");
                    self.interior(id, &globals)?
                }
            };
            sections.push(section);
        }

        sections.push(self.outro(&globals)?);

        let piece = Piece {
            sections,
            waves: globals.waves,
            seconds_per_beat: globals.seconds_per_beat,
            tonic: globals.tonic,
        };
        info!(
            "composed {} sections, {:.0}s",
            piece.sections.len(),
            piece.duration_seconds()
        );
        Ok(piece)
    }

    fn draw_tempo(&mut self) -> f64 {
        self.config.seconds_per_beat_min + self.rng.next_f64() * self.config.seconds_per_beat_span
    }

    fn draw_time(&mut self, seconds_per_beat: f64, measures: MeasureRange) -> Result<Time, ComposeError> {
        let c = &self.config;
        let (bpm_min, bpm_span) = (c.beats_per_measure_min, c.beats_per_measure_span);
        let (sub_min, sub_span) = (c.subdivisions_per_beat_min, c.subdivisions_per_beat_span);

        let num_measures = self.rng.even_in_range(measures.min, measures.max);
        let beats_per_measure = bpm_min + self.rng.uniform(bpm_span);
        let subdivide = beats_per_measure * (sub_min + self.rng.uniform(sub_span));
        Time::new(seconds_per_beat, beats_per_measure, subdivide, num_measures)
    }

    /// Run a fresh harmonic generator over `time`.
    fn progression(&mut self, time: &Time, tonic: Chord) -> Result<ChordProgression, ComposeError> {
        let rate = self.rng.next_f64() * time.beats_per_measure as f64;
        let lead_to = self.rng.uniform(8);
        let mut generator = HarmonicGenerator::new(tonic, self.rng.fork());
        generator.generate(time.beats_per_measure, time.num_measures, rate, lead_to)
    }

    /// A tonic on one of the global tonic's degrees, with its own chord type.
    fn subordinate_tonic(&mut self, global: &Chord) -> Result<Chord, ComposeError> {
        let root_hz = *choose_uniform(global.scale_hz(), &mut self.rng)?;
        let chord_type = *choose_uniform(&ChordType::ALL, &mut self.rng)?;
        let tonic = Chord::new(root_hz, chord_type);
        if chord_type.has_minor_seventh() && self.rng.random_bool(self.config.leading_tone_chance) {
            let raised = BTreeMap::from([(7, 1)]);
            return Ok(tonic.with_chromatic(&raised));
        }
        Ok(tonic)
    }

    fn part(
        &mut self,
        kind: InstrumentKind,
        globals: &Globals,
        time: &Time,
        progression: &ChordProgression,
    ) -> Result<Instrument, ComposeError> {
        let weight = 1.0 - self.rng.next_f64() * self.config.weight_jitter;
        let wave = globals.waves.get(&kind).copied().unwrap_or(Wave::Sine);
        self.factory.instrument(PartRequest {
            kind,
            wave,
            time,
            progression,
            weight,
        })
    }

    fn randomize_dynamics(&mut self, section: &mut Section) {
        section.start_volume = self.draw_volume();
        section.end_volume = self.draw_volume();
    }

    fn draw_volume(&mut self) -> u32 {
        self.config.volume_min + self.rng.uniform(self.config.volume_span as usize) as u32
    }

    fn interior(&mut self, id: u32, globals: &Globals) -> Result<Section, ComposeError> {
        let seconds_per_beat = if self.rng.random_bool(self.config.chance_to_diverge) {
            self.draw_tempo()
        } else {
            globals.seconds_per_beat
        };
        let time = self.draw_time(seconds_per_beat, self.config.interior_measures)?;
        let tonic = self.subordinate_tonic(&globals.tonic)?;
        debug!(
            "  {}/{} x{} at {:.3} s/beat over {:.1} Hz {:?}",
            time.beats_per_measure,
            time.subdivisions_per_beat(),
            time.num_measures,
            time.seconds_per_beat,
            tonic.root_hz(),
            tonic.chord_type()
        );
        let progression = self.progression(&time, tonic)?;

        let mut section = Section::new(id, time);
        for kind in InstrumentKind::ALL {
            let instrument = self.part(kind, globals, &time, &progression)?;
            section.add_instrument(instrument);
        }
        self.randomize_dynamics(&mut section);
        section.randomize_balances(&mut self.rng);
        Ok(section)
    }

    fn intro(&mut self, globals: &Globals) -> Result<Section, ComposeError> {
        let time = self.draw_time(globals.seconds_per_beat, self.config.intro_measures)?;
        let progression = self.progression(&time, globals.tonic.clone())?;
        let mut section = Section::new(self.config.intro_id, time);

        let lead = *choose_uniform(&InstrumentKind::ALL, &mut self.rng)?;
        let instrument = self.part(lead, globals, &time, &progression)?;
        section.add_instrument(instrument);

        for kind in InstrumentKind::ALL {
            if kind == lead {
                continue;
            }
            // Validated configs guarantee at least two intro measures.
            let delay = 1 + self.rng.uniform(time.num_measures - 1);
            let late_time = time.truncated(delay)?;
            let tail = progression.skip_measures(delay);
            let instrument = self.part(kind, globals, &late_time, &tail)?;
            section.add_instrument_delayed(instrument, delay);
        }
        debug!(
            "intro: {:?} leads, entrances {:?}",
            lead,
            section.parts.iter().map(|p| p.delay_measures).collect::<Vec<_>>()
        );

        self.randomize_dynamics(&mut section);
        section.randomize_balances(&mut self.rng);
        Ok(section)
    }

    fn outro(&mut self, globals: &Globals) -> Result<Section, ComposeError> {
        let time = self.draw_time(globals.seconds_per_beat, self.config.outro_measures)?;
        let progression = self.progression(&time, globals.tonic.clone())?;
        let mut section = Section::new(self.config.outro_id, time);
        for kind in InstrumentKind::ALL {
            let instrument = self.part(kind, globals, &time, &progression)?;
            section.add_instrument(instrument);
        }
        section.start_volume = self.draw_volume();
        section.end_volume = 0;
        section.randomize_balances(&mut self.rng);
        Ok(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compose(seed: u64) -> Piece {
        StructureComposer::new(seed, ComposerConfig::default())
            .unwrap()
            .compose()
            .unwrap()
    }

    #[test]
    fn test_piece_shape() {
        for seed in 0..100 {
            let piece = compose(seed);
            let n = piece.sections.len();
            assert!((4..=8).contains(&n), "seed {seed}: {n} sections");
            assert_eq!(piece.sections[0].id, 100);
            assert_eq!(piece.sections[n - 1].id, 101);
            for section in &piece.sections[1..n - 1] {
                assert!(section.id as usize <= n / 2, "seed {seed}: id {} too large", section.id);
            }
        }
    }

    #[test]
    fn test_same_seed_same_piece() {
        assert_eq!(compose(77), compose(77));
        assert_ne!(compose(77), compose(78));
    }

    #[test]
    fn test_every_section_has_each_kind_once() {
        for seed in 0..30 {
            for section in &compose(seed).sections {
                let mut kinds = section.instrument_kinds();
                kinds.sort();
                assert_eq!(kinds, InstrumentKind::ALL.to_vec());
            }
        }
    }

    #[test]
    fn test_waves_fixed_across_piece() {
        let piece = compose(12);
        for section in &piece.sections {
            for part in &section.parts {
                assert_eq!(piece.waves[&part.instrument.kind], part.instrument.wave);
            }
        }
    }

    #[test]
    fn test_outro_fades_to_silence() {
        for seed in 0..100 {
            let piece = compose(seed);
            let outro = piece.sections.last().unwrap();
            assert_eq!(outro.end_volume, 0);
            assert!(outro.start_volume >= 50);
            assert!(outro.parts.iter().all(|p| p.delay_measures == 0));
            assert_eq!(outro.time.seconds_per_beat, piece.seconds_per_beat);
        }
    }

    #[test]
    fn test_intro_layers_entrances() {
        for seed in 0..100 {
            let piece = compose(seed);
            let intro = &piece.sections[0];
            let measures = intro.time.num_measures;
            let immediate = intro.parts.iter().filter(|p| p.delay_measures == 0).count();
            assert_eq!(immediate, 1, "seed {seed}: exactly one part should lead");
            assert_eq!(intro.parts[0].delay_measures, 0);
            for part in &intro.parts {
                assert!(part.delay_measures < measures);
                let inst_time = part.instrument.time;
                assert_eq!(inst_time.num_measures, measures - part.delay_measures);
                assert_eq!(part.instrument.span(), inst_time.total_subdivisions());
            }
            assert!((50..150).contains(&intro.end_volume));
        }
    }

    #[test]
    fn test_reprises_share_material() {
        let mut reprises = 0;
        for seed in 0..100 {
            let piece = compose(seed);
            let n = piece.sections.len();
            for i in 1..n - 1 {
                let current = &piece.sections[i];
                let Some(earlier) = piece.sections[..i].iter().rev().find(|s| s.id == current.id)
                else {
                    continue;
                };
                reprises += 1;
                assert_eq!(current.time, earlier.time);
                assert_eq!(current.parts.len(), earlier.parts.len());
                assert_eq!(current.instrument_kinds(), earlier.instrument_kinds());
                for (now, before) in current.parts.iter().zip(&earlier.parts) {
                    assert!(now.instrument.notes.len() >= before.instrument.notes.len());
                    assert_eq!(now.instrument.span(), before.instrument.span());
                }
                assert!((50..150).contains(&current.start_volume));
                assert!((50..150).contains(&current.end_volume));
            }
        }
        assert!(reprises > 0, "100 seeds should produce at least one reprise");
    }

    #[test]
    fn test_no_divergence_keeps_global_tempo() {
        let config = ComposerConfig {
            chance_to_diverge: 0.0,
            ..Default::default()
        };
        let piece = StructureComposer::new(5, config).unwrap().compose().unwrap();
        for section in &piece.sections {
            assert_eq!(section.time.seconds_per_beat, piece.seconds_per_beat);
        }
    }

    #[test]
    fn test_minimal_piece_is_intro_and_outro() {
        let config = ComposerConfig {
            min_sections: 2,
            max_sections: 2,
            ..Default::default()
        };
        let piece = StructureComposer::new(1, config).unwrap().compose().unwrap();
        let ids: Vec<u32> = piece.sections.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![100, 101]);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = ComposerConfig {
            min_sections: 0,
            ..Default::default()
        };
        assert!(matches!(
            StructureComposer::new(1, config),
            Err(ComposeError::InvalidConfig(_))
        ));

        let config = ComposerConfig {
            volume_min: u32::MAX,
            ..Default::default()
        };
        assert!(StructureComposer::new(1, config).is_err());
    }

    #[test]
    fn test_draws_at_the_top_of_u32_ranges() {
        let config = ComposerConfig {
            tonic_hz_min: u32::MAX - 10,
            tonic_hz_span: 10,
            volume_min: u32::MAX - 100,
            ..Default::default()
        };
        let piece = StructureComposer::new(8, config).unwrap().compose().unwrap();
        assert!(piece.tonic.root_hz() >= (u32::MAX - 10) as f64);
        for section in &piece.sections {
            assert!(section.start_volume >= u32::MAX - 100);
        }
    }

    #[test]
    fn test_leading_tone_on_flat_seventh_tonics() {
        let config = ComposerConfig {
            leading_tone_chance: 1.0,
            ..Default::default()
        };
        let mut composer = StructureComposer::new(3, config).unwrap();
        let global = Chord::new(150.0, ChordType::Ionian);
        for _ in 0..200 {
            let tonic = composer.subordinate_tonic(&global).unwrap();
            assert!(global.scale_hz().contains(&tonic.root_hz()));
            if tonic.chord_type().has_minor_seventh() {
                assert_eq!(tonic.chromatic().get(&7), Some(&1));
            } else {
                assert!(tonic.chromatic().is_empty());
            }
        }
    }

    /// Counts requests and hands back empty parts.
    struct CountingFactory {
        requests: usize,
    }

    impl InstrumentFactory for CountingFactory {
        fn instrument(&mut self, request: PartRequest<'_>) -> Result<Instrument, ComposeError> {
            self.requests += 1;
            Ok(Instrument {
                kind: request.kind,
                wave: request.wave,
                weight: request.weight,
                time: *request.time,
                notes: Vec::new(),
            })
        }
    }

    #[test]
    fn test_reprises_do_not_call_factory() {
        for seed in 0..40 {
            let mut composer =
                StructureComposer::with_factory(seed, ComposerConfig::default(), CountingFactory { requests: 0 })
                    .unwrap();
            let piece = composer.compose().unwrap();
            let n = piece.sections.len();
            let fresh = (1..n - 1)
                .filter(|&i| {
                    let id = piece.sections[i].id;
                    !piece.sections[..i].iter().any(|s| s.id == id)
                })
                .count();
            let kinds = InstrumentKind::ALL.len();
            assert_eq!(composer.factory().requests, (fresh + 2) * kinds, "seed {seed}");
        }
    }
}
