//! Correlation Scorer
//!
//! Picks a persistent address for each device group's randomized
//! addresses. Every signal is derived from group-wide aggregates, so all
//! (randomized, persistent) pairs inside a group score the same; the first
//! pair in sorted order that beats the running best is kept.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classify::RosterPool;
use super::store::{DeviceGroup, DeviceGroupStore};
use crate::wireless::ieee80211::MacAddr;

/// Scoring weights and cutoffs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Time span below which the tight bonus applies (seconds)
    pub time_tight_secs: f64,
    pub time_tight_weight: i32,
    pub time_loose_secs: f64,
    pub time_loose_weight: i32,

    /// Signal spread below which the tight bonus applies (dB)
    pub signal_tight_db: i16,
    pub signal_tight_weight: i32,
    pub signal_loose_db: i16,
    pub signal_loose_weight: i32,

    /// All frames on a single channel
    pub single_channel_weight: i32,
    /// Any SSID probed by the group
    pub ssid_weight: i32,
    /// Awarded to every pair, since groups share a stable fingerprint
    pub fingerprint_weight: i32,
    /// All frames share a single rate fingerprint
    pub single_rate_weight: i32,

    /// Minimum score for an assignment
    pub threshold: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            time_tight_secs: 60.0,
            time_tight_weight: 5,
            time_loose_secs: 300.0,
            time_loose_weight: 2,
            signal_tight_db: 5,
            signal_tight_weight: 3,
            signal_loose_db: 15,
            signal_loose_weight: 1,
            single_channel_weight: 2,
            ssid_weight: 10,
            fingerprint_weight: 3,
            single_rate_weight: 2,
            threshold: 5,
        }
    }
}

/// Per-signal contributions to a pair score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub time: i32,
    pub signal: i32,
    pub channel: i32,
    pub ssid: i32,
    pub fingerprint: i32,
    pub rate: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.time + self.signal + self.channel + self.ssid + self.fingerprint + self.rate
    }
}

/// Outcome for one device group
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub fingerprint: String,
    /// Persistent address, set only when the score reached the threshold
    pub persistent: Option<MacAddr>,
    /// Best pair score (0 when the group had no pair to score)
    pub score: i32,
    pub breakdown: ScoreBreakdown,
    /// All randomized addresses of the group, sorted
    pub randomized: Vec<MacAddr>,
}

impl Assignment {
    pub fn is_assigned(&self) -> bool {
        self.persistent.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Correlator {
    config: ScoringConfig,
    pool: RosterPool,
}

impl Correlator {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            pool: RosterPool::new(),
        }
    }

    /// Restrict persistent candidates to roster members. An empty roster
    /// leaves every persistent address of a group eligible.
    pub fn with_pool(mut self, pool: RosterPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Signals for a group; identical for every pair within it.
    pub fn signals(&self, group: &DeviceGroup) -> ScoreBreakdown {
        let cfg = &self.config;
        let mut score = ScoreBreakdown::default();

        if let Some(span) = group.time_span() {
            if span < cfg.time_tight_secs {
                score.time = cfg.time_tight_weight;
            } else if span < cfg.time_loose_secs {
                score.time = cfg.time_loose_weight;
            }
        }

        if let Some(spread) = group.signal_spread() {
            if spread < cfg.signal_tight_db {
                score.signal = cfg.signal_tight_weight;
            } else if spread < cfg.signal_loose_db {
                score.signal = cfg.signal_loose_weight;
            }
        }

        if group.distinct_channels().len() == 1 {
            score.channel = cfg.single_channel_weight;
        }

        if !group.ssids.is_empty() {
            score.ssid = cfg.ssid_weight;
        }

        score.fingerprint = cfg.fingerprint_weight;

        if group.rate_hashes.len() == 1 {
            score.rate = cfg.single_rate_weight;
        }

        score
    }

    fn candidates<'g>(&self, group: &'g DeviceGroup) -> Vec<&'g MacAddr> {
        group
            .persistent
            .iter()
            .filter(|addr| self.pool.is_empty() || self.pool.contains(addr))
            .collect()
    }

    /// Score every (randomized, persistent) pair of a group and keep the
    /// first strict improvement over the running best.
    pub fn assign(&self, group: &DeviceGroup) -> Assignment {
        let breakdown = self.signals(group);
        let candidates = self.candidates(group);

        let mut best: Option<MacAddr> = None;
        let mut best_score = 0;
        for _randomized in &group.randomized {
            for persistent in &candidates {
                let score = breakdown.total();
                if score > best_score {
                    best = Some(**persistent);
                    best_score = score;
                }
            }
        }

        let persistent = best.filter(|_| best_score >= self.config.threshold);
        if let Some(addr) = &persistent {
            debug!(
                fingerprint = %group.fingerprint,
                score = best_score,
                "assigned {} randomized address(es) to {}",
                group.randomized.len(),
                addr
            );
        }

        Assignment {
            fingerprint: group.fingerprint.clone(),
            persistent,
            score: best_score,
            breakdown,
            randomized: group.randomized.iter().copied().collect(),
        }
    }

    /// Assignments for every group, in fingerprint order
    pub fn assign_all(&self, store: &DeviceGroupStore) -> Vec<Assignment> {
        store.groups().map(|group| self.assign(group)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::elements::{FrameMeta, ProbeFrame};
    use crate::wireless::ieee80211::TaggedElement;

    const RANDOM: &str = "02:00:00:00:00:01";
    const REAL: &str = "00:11:22:33:44:55";

    struct Probe {
        mac: &'static str,
        ts: f64,
        signal: Option<i8>,
        channel: Option<u8>,
        ssid: Option<&'static str>,
        rates: Vec<u8>,
    }

    impl Probe {
        fn new(mac: &'static str, ts: f64) -> Self {
            Self {
                mac,
                ts,
                signal: None,
                channel: None,
                ssid: None,
                rates: vec![0x82, 0x84],
            }
        }

        fn signal(mut self, dbm: i8) -> Self {
            self.signal = Some(dbm);
            self
        }

        fn channel(mut self, channel: u8) -> Self {
            self.channel = Some(channel);
            self
        }

        fn ssid(mut self, ssid: &'static str) -> Self {
            self.ssid = Some(ssid);
            self
        }

        fn rates(mut self, rates: &[u8]) -> Self {
            self.rates = rates.to_vec();
            self
        }

        fn build(self) -> ProbeFrame {
            let mut elements = vec![
                TaggedElement::new(1, self.rates),
                TaggedElement::new(45, vec![0xad, 0x01, 0x17, 0xff]),
                TaggedElement::new(221, vec![0x00, 0x50, 0xf2, 0x08]),
            ];
            if let Some(ssid) = self.ssid {
                elements.insert(0, TaggedElement::new(0, ssid.as_bytes().to_vec()));
            }
            let meta = FrameMeta {
                source: self.mac.parse().unwrap(),
                timestamp: self.ts,
                signal_dbm: self.signal,
                channel: self.channel,
            };
            ProbeFrame::from_elements(meta, elements).unwrap()
        }
    }

    fn store_of(frames: Vec<Probe>) -> DeviceGroupStore {
        let mut store = DeviceGroupStore::new();
        store.ingest_all(frames.into_iter().map(Probe::build));
        store
    }

    fn only_assignment(store: &DeviceGroupStore, correlator: &Correlator) -> Assignment {
        let mut all = correlator.assign_all(store);
        assert_eq!(all.len(), 1);
        all.remove(0)
    }

    #[test]
    fn test_all_signals_aligned() {
        let store = store_of(vec![
            Probe::new(RANDOM, 1000.0).signal(-40).channel(6).ssid("home"),
            Probe::new(REAL, 1010.0).signal(-42).channel(6),
        ]);
        let a = only_assignment(&store, &Correlator::default());

        assert_eq!(a.score, 25);
        assert_eq!(
            a.breakdown,
            ScoreBreakdown { time: 5, signal: 3, channel: 2, ssid: 10, fingerprint: 3, rate: 2 }
        );
        assert_eq!(a.persistent, Some(REAL.parse().unwrap()));
        assert_eq!(a.randomized, vec![RANDOM.parse().unwrap()]);
    }

    #[test]
    fn test_assigned_without_ssid() {
        let store = store_of(vec![
            Probe::new(RANDOM, 1000.0).signal(-40).channel(6),
            Probe::new(REAL, 1010.0).signal(-42).channel(6).rates(&[0x02, 0x04]),
        ]);
        let a = only_assignment(&store, &Correlator::default());

        assert_eq!(a.score, 13);
        assert!(a.is_assigned());
    }

    #[test]
    fn test_weak_group_unassigned() {
        let store = store_of(vec![
            Probe::new(RANDOM, 1000.0).signal(-40).channel(1),
            Probe::new(REAL, 1400.0).signal(-60).channel(11).rates(&[0x02, 0x04]),
        ]);
        let a = only_assignment(&store, &Correlator::default());

        assert_eq!(a.score, 3);
        assert!(a.persistent.is_none());
        assert_eq!(a.randomized.len(), 1);
    }

    #[test]
    fn test_threshold_boundary() {
        // time 120s (+2), no power, two channels, no SSID, fp +3, two rates
        let store = store_of(vec![
            Probe::new(RANDOM, 0.0).channel(1),
            Probe::new(REAL, 120.0).channel(6).rates(&[0x02]),
        ]);
        let correlator = Correlator::default();
        let a = only_assignment(&store, &correlator);
        assert_eq!(a.score, 5);
        assert!(a.is_assigned());

        // time 400s (+0), spread 10 dB (+1), fp +3 => 4
        let store = store_of(vec![
            Probe::new(RANDOM, 0.0).signal(-40).channel(1),
            Probe::new(REAL, 400.0).signal(-50).channel(6).rates(&[0x02]),
        ]);
        let a = only_assignment(&store, &correlator);
        assert_eq!(a.score, 4);
        assert!(!a.is_assigned());
    }

    #[test]
    fn test_no_persistent_candidate() {
        let store = store_of(vec![
            Probe::new(RANDOM, 0.0).ssid("home"),
            Probe::new("06:00:00:00:00:02", 5.0),
        ]);
        let a = only_assignment(&store, &Correlator::default());
        assert!(a.persistent.is_none());
        assert_eq!(a.score, 0);
        assert_eq!(a.randomized.len(), 2);
    }

    #[test]
    fn test_no_randomized_address() {
        let store = store_of(vec![Probe::new(REAL, 0.0).ssid("home")]);
        let a = only_assignment(&store, &Correlator::default());
        assert!(a.persistent.is_none());
        assert!(a.randomized.is_empty());
    }

    #[test]
    fn test_tie_break_keeps_lowest_address() {
        let store = store_of(vec![
            Probe::new(RANDOM, 0.0).ssid("home"),
            Probe::new("00:99:00:00:00:01", 1.0),
            Probe::new("00:11:00:00:00:01", 2.0),
            Probe::new("00:55:00:00:00:01", 3.0),
        ]);
        let a = only_assignment(&store, &Correlator::default());
        assert_eq!(a.persistent, Some("00:11:00:00:00:01".parse().unwrap()));
    }

    #[test]
    fn test_roster_pool_restricts_candidates() {
        let store = store_of(vec![
            Probe::new(RANDOM, 0.0).ssid("home"),
            Probe::new("00:11:00:00:00:01", 1.0),
            Probe::new("00:55:00:00:00:01", 2.0),
        ]);

        let pool: RosterPool = vec!["00:55:00:00:00:01".parse().unwrap()].into_iter().collect();
        let correlator = Correlator::default().with_pool(pool);
        let a = only_assignment(&store, &correlator);
        assert_eq!(a.persistent, Some("00:55:00:00:00:01".parse().unwrap()));

        let other: RosterPool = vec!["00:77:00:00:00:01".parse().unwrap()].into_iter().collect();
        let correlator = Correlator::default().with_pool(other);
        assert!(only_assignment(&store, &correlator).persistent.is_none());
    }

    #[test]
    fn test_custom_threshold() {
        let config = ScoringConfig {
            threshold: 30,
            ..Default::default()
        };
        let store = store_of(vec![
            Probe::new(RANDOM, 1000.0).signal(-40).channel(6).ssid("home"),
            Probe::new(REAL, 1010.0).signal(-42).channel(6),
        ]);
        let a = only_assignment(&store, &Correlator::new(config));
        assert_eq!(a.score, 25);
        assert!(!a.is_assigned());
    }

    #[test]
    fn test_reverse_order_same_assignment() {
        let probes = || {
            vec![
                Probe::new(RANDOM, 1000.0).signal(-40).channel(6).ssid("home"),
                Probe::new("0e:00:00:00:00:07", 1003.0).signal(-43).channel(6),
                Probe::new(REAL, 1010.0).signal(-42).channel(6),
            ]
        };
        let forward = store_of(probes());
        let mut reversed = probes();
        reversed.reverse();
        let backward = store_of(reversed);

        let correlator = Correlator::default();
        assert_eq!(correlator.assign_all(&forward), correlator.assign_all(&backward));
    }
}
