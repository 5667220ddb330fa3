mod diagnostics;
mod noisy;
mod round_trip;
