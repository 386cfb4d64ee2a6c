//! Host transport and tempo-sync helpers.
//!
//! The host snapshots its transport into [`TransportInfo`] before each
//! block; tempo-synced engines quantize their time parameters to
//! [`NoteDivision`] values against the reported BPM. A BPM of zero (or
//! anything non-positive) means "no tempo available" and engines fall
//! back to their free-running time parameter.

/// Snapshot of host transport state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportInfo {
    /// Tempo in beats per minute; `<= 0` means the host has no tempo.
    pub bpm: f64,
    /// Time signature numerator.
    pub time_sig_num: u16,
    /// Time signature denominator.
    pub time_sig_den: u16,
    /// Whether the transport is rolling.
    pub is_playing: bool,
    /// Song position in quarter notes.
    pub ppq_position: f64,
}

impl Default for TransportInfo {
    fn default() -> Self {
        Self {
            bpm: 0.0,
            time_sig_num: 4,
            time_sig_den: 4,
            is_playing: false,
            ppq_position: 0.0,
        }
    }
}

impl TransportInfo {
    /// Whether tempo sync is possible with this snapshot.
    pub fn has_tempo(&self) -> bool {
        self.bpm > 0.0
    }
}

/// Musical note divisions for tempo sync, two bars down to a
/// thirty-second note with the dotted and triplet values in between,
/// longest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteDivision {
    /// Two bars of 4/4 (8 beats).
    TwoBars,
    /// Dotted whole (6 beats).
    DottedWhole,
    /// Whole note (4 beats).
    Whole,
    /// Dotted half (3 beats).
    DottedHalf,
    /// Half note (2 beats).
    Half,
    /// Dotted quarter (1.5 beats).
    DottedQuarter,
    /// Half triplet (4/3 beats).
    HalfTriplet,
    /// Quarter note (1 beat).
    Quarter,
    /// Dotted eighth (0.75 beats).
    DottedEighth,
    /// Quarter triplet (2/3 beat).
    QuarterTriplet,
    /// Eighth note (0.5 beats).
    Eighth,
    /// Dotted sixteenth (0.375 beats).
    DottedSixteenth,
    /// Eighth triplet (1/3 beat).
    EighthTriplet,
    /// Sixteenth note (0.25 beats).
    Sixteenth,
    /// Sixteenth triplet (1/6 beat).
    SixteenthTriplet,
    /// Thirty-second note (0.125 beats).
    ThirtySecond,
}

impl NoteDivision {
    /// All divisions, longest first.
    pub const ALL: [NoteDivision; 16] = [
        NoteDivision::TwoBars,
        NoteDivision::DottedWhole,
        NoteDivision::Whole,
        NoteDivision::DottedHalf,
        NoteDivision::Half,
        NoteDivision::DottedQuarter,
        NoteDivision::HalfTriplet,
        NoteDivision::Quarter,
        NoteDivision::DottedEighth,
        NoteDivision::QuarterTriplet,
        NoteDivision::Eighth,
        NoteDivision::DottedSixteenth,
        NoteDivision::EighthTriplet,
        NoteDivision::Sixteenth,
        NoteDivision::SixteenthTriplet,
        NoteDivision::ThirtySecond,
    ];

    /// Length in quarter-note beats.
    pub const fn beats(&self) -> f32 {
        match self {
            NoteDivision::TwoBars => 8.0,
            NoteDivision::DottedWhole => 6.0,
            NoteDivision::Whole => 4.0,
            NoteDivision::DottedHalf => 3.0,
            NoteDivision::Half => 2.0,
            NoteDivision::DottedQuarter => 1.5,
            NoteDivision::HalfTriplet => 4.0 / 3.0,
            NoteDivision::Quarter => 1.0,
            NoteDivision::DottedEighth => 0.75,
            NoteDivision::QuarterTriplet => 2.0 / 3.0,
            NoteDivision::Eighth => 0.5,
            NoteDivision::DottedSixteenth => 0.375,
            NoteDivision::EighthTriplet => 1.0 / 3.0,
            NoteDivision::Sixteenth => 0.25,
            NoteDivision::SixteenthTriplet => 1.0 / 6.0,
            NoteDivision::ThirtySecond => 0.125,
        }
    }

    /// Duration in seconds at `bpm`. Returns `None` when `bpm <= 0`.
    pub fn seconds(&self, bpm: f64) -> Option<f32> {
        if bpm > 0.0 {
            Some((f64::from(self.beats()) * 60.0 / bpm) as f32)
        } else {
            None
        }
    }
}

/// Quantize a free time in seconds to the nearest note division at `bpm`.
///
/// Returns the snapped time, or the input unchanged when no tempo is
/// available.
pub fn snap_to_division(seconds: f32, bpm: f64) -> f32 {
    if bpm <= 0.0 {
        return seconds;
    }
    let mut best = seconds;
    let mut best_err = f32::INFINITY;
    for div in NoteDivision::ALL {
        if let Some(t) = div.seconds(bpm) {
            let err = (t - seconds).abs();
            if err < best_err {
                best_err = err;
                best = t;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_note_at_120_is_half_second() {
        assert_eq!(NoteDivision::Quarter.seconds(120.0), Some(0.5));
    }

    #[test]
    fn zero_bpm_means_no_sync() {
        assert_eq!(NoteDivision::Quarter.seconds(0.0), None);
        assert_eq!(NoteDivision::Quarter.seconds(-10.0), None);
        let free = 0.337;
        assert_eq!(snap_to_division(free, 0.0), free);
    }

    #[test]
    fn snap_picks_nearest_division() {
        // At 120 BPM: eighth = 0.25 s, dotted eighth = 0.375 s.
        assert_eq!(snap_to_division(0.26, 120.0), 0.25);
        assert_eq!(snap_to_division(0.36, 120.0), 0.375);
    }

    #[test]
    fn grid_spans_thirty_second_to_two_bars() {
        // At 120 BPM the grid ends are 62.5 ms and 4 s; anything past
        // them snaps to the end value.
        assert_eq!(NoteDivision::ThirtySecond.seconds(120.0), Some(0.0625));
        assert_eq!(NoteDivision::TwoBars.seconds(120.0), Some(4.0));
        assert_eq!(snap_to_division(0.01, 120.0), 0.0625);
        assert_eq!(snap_to_division(10.0, 120.0), 4.0);
    }

    #[test]
    fn dotted_and_triplet_values_are_on_the_grid() {
        // 0.187 s at 120 BPM sits on the dotted sixteenth (0.1875 s);
        // 0.34 s on the quarter triplet (1/3 s).
        assert_eq!(snap_to_division(0.187, 120.0), 0.1875);
        let triplet = snap_to_division(0.34, 120.0);
        assert!((triplet - 1.0 / 3.0).abs() < 1e-6, "got {triplet}");
    }

    #[test]
    fn default_transport_has_no_tempo() {
        let t = TransportInfo::default();
        assert!(!t.has_tempo());
        assert!(!t.is_playing);
    }

    #[test]
    fn divisions_ordered_longest_first() {
        for pair in NoteDivision::ALL.windows(2) {
            assert!(pair[0].beats() > pair[1].beats());
        }
    }
}
