use num_traits::Float;

/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}

/// Quantile with linear interpolation between the two nearest order
/// statistics, computed in O(n) via selection rather than a full sort.
///
/// Reorders `data` as a side effect. NaNs order after every other value.
pub fn quantile<T: Float>(data: &mut [T], q: T) -> T {
    assert!(!data.is_empty(), "cannot take a quantile of an empty slice");
    assert!(q >= T::zero() && q <= T::one(), "quantile fraction must lie in [0, 1]");

    let n = data.len();
    if n == 1 { return data[0]; }

    let h = T::from(n - 1).unwrap() * q;
    let h_floor = h.floor().to_usize().unwrap();
    let h_frac = h - h.floor();

    if h_floor >= n - 1 {
        let (_, &mut max, _) = data.select_nth_unstable_by(n - 1, nan_last);
        return max;
    }

    let (_, &mut lower, upper) = data.select_nth_unstable_by(h_floor, nan_last);
    if h_frac == T::zero() { return lower; }

    // The next order statistic is the smallest element of the upper partition
    let upper_min = upper.iter().copied().min_by(nan_last).unwrap_or(lower);
    lower + h_frac * (upper_min - lower)
}

fn nan_last<T: Float>(a: &T, b: &T) -> std::cmp::Ordering {
    use std::cmp::Ordering::*;
    a.partial_cmp(b).unwrap_or_else(|| match (a.is_nan(), b.is_nan()) {
        (true, false) => Greater,
        (false, true) => Less,
        _             => Equal,
    })
}

pub mod timing {

    use super::group_digits;
    use std::io::Write;
    use std::time::Instant;

    /// Stopwatch for reporting the wall-clock time of each run phase.
    pub struct Progress {
        previous: Instant,
    }

    impl Progress {

        #[allow(clippy::new_without_default)]
        pub fn new() -> Self { Self { previous: Instant::now() } }

        /// Print message, append ellipsis, flush stdout, stay on same line, start timer.
        pub fn start(&mut self, message: &str) {
            print!("{message} ... ");
            std::io::stdout().flush().unwrap();
            self.start_timer();
        }

        // Print time elapsed since last start or done
        pub fn done(&mut self) {
            println!("{} ms", group_digits(self.previous.elapsed().as_millis()));
            self.start_timer();
        }

        // Print message followed by time elapsed since last start or done
        pub fn done_with_message(&mut self, message: &str) {
            println!("{message}: {} ms",
                     group_digits(self.previous.elapsed().as_millis()));
            self.start_timer();
        }

        fn start_timer(&mut self) { self.previous = Instant::now() }
    }
}
