//! Register-level integration tests: the whole device driven the way a
//! host driver would, through reads and writes at the mapped offsets.

use std::sync::{Arc, Mutex};

use fftacc_core::{BufferId, Event};
use fftacc_fixed::FixedComplex;
use fftacc_regs::regmap::{self, config, ctrl, int, overflow, scale, status};
use fftacc_regs::{FftDevice, RegError};
use num_complex::Complex64;

fn word(re: i16, im: i16) -> u32 {
    FixedComplex::new(re, im).to_word()
}

/// Programs length, config and rescale control for an `n`-point transform.
fn setup(d: &mut FftDevice, n: usize, config_extra: u32, rescale_word: u32) {
    let log2 = n.trailing_zeros();
    d.write(regmap::FFT_LENGTH, n as u32).unwrap();
    d.write(regmap::FFT_CONFIG, log2 | config::OVERFLOW_DETECT | config_extra)
        .unwrap();
    d.write(regmap::RESCALE_CTRL, rescale_word).unwrap();
}

fn start(d: &mut FftDevice) {
    d.write(regmap::FFT_CTRL, ctrl::START | ctrl::RESCALE_EN | ctrl::TRACK_EN)
        .unwrap();
}

/// Ticks until the device reports done or error.
fn run(d: &mut FftDevice) -> u32 {
    for _ in 0..60_000 {
        d.tick();
        let s = d.read(regmap::FFT_STATUS).unwrap();
        if s & (status::DONE | status::ERROR) != 0 {
            return s;
        }
    }
    panic!("transform did not terminate");
}

fn noise(n: usize, seed: u64, amplitude: i16) -> Vec<FixedComplex> {
    let mut state = seed.max(1);
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    (0..n)
        .map(|_| {
            let re = (next() % (2 * amplitude as u64 + 1)) as i32 - amplitude as i32;
            let im = (next() % (2 * amplitude as u64 + 1)) as i32 - amplitude as i32;
            FixedComplex::new(re as i16, im as i16)
        })
        .collect()
}

fn naive_dft(input: &[FixedComplex]) -> Vec<Complex64> {
    let n = input.len();
    (0..n)
        .map(|k| {
            let mut acc = Complex64::new(0.0, 0.0);
            for (j, x) in input.iter().enumerate() {
                let angle = -2.0 * std::f64::consts::PI * (j * k % n) as f64 / n as f64;
                acc += Complex64::new(x.re as f64, x.im as f64)
                    * Complex64::new(angle.cos(), angle.sin());
            }
            acc
        })
        .collect()
}

fn bit_reverse(index: usize, bits: u32) -> usize {
    index.reverse_bits() >> (usize::BITS - bits)
}

#[test]
fn zero_input_stays_zero() {
    let mut d = FftDevice::new();
    setup(&mut d, 256, 0, 0x0F);
    start(&mut d);
    let s = run(&mut d);

    assert_ne!(s & status::DONE, 0);
    assert_eq!(s & (status::ERROR | status::OVERFLOW), 0);
    for k in 0..256 {
        assert_eq!(d.read(regmap::OUTPUT_A_BASE + 4 * k).unwrap(), 0);
    }
    let sf = d.read(regmap::SCALE_FACTOR).unwrap();
    assert_ne!(sf & scale::VALID, 0);
    assert_eq!(sf & 0xFF, 0);
}

#[test]
fn impulse_yields_flat_spectrum() {
    let mut d = FftDevice::new();
    setup(&mut d, 256, 0, 0x0F);
    d.write(regmap::INPUT_A_BASE, word(i16::MAX, 0)).unwrap();
    start(&mut d);
    let s = run(&mut d);

    assert_ne!(s & status::DONE, 0);
    assert_eq!(s & status::OVERFLOW, 0);
    for k in 0..256 {
        let out = FixedComplex::from_word(d.read(regmap::OUTPUT_A_BASE + 4 * k).unwrap());
        assert!(
            (out.re as i32 - i16::MAX as i32).abs() <= 8 && out.im.abs() <= 8,
            "bin {k} not flat: {out:?}"
        );
    }
    // A unit impulse never overflows, so no scaling was applied.
    assert_eq!(d.read(regmap::SCALE_FACTOR).unwrap() & 0xFF, 0);
    assert_eq!(d.read(regmap::OVERFLOW_STATUS).unwrap(), 0);
}

#[test]
fn matches_float_dft_for_small_signals() {
    for n in [256usize, 1024] {
        let input = noise(n, 42, 5);
        let reference = naive_dft(&input);

        let mut d = FftDevice::new();
        d.load_input(BufferId::A, &input).unwrap();
        setup(&mut d, n, 0, 0x0F);
        start(&mut d);
        let s = run(&mut d);
        assert_ne!(s & status::DONE, 0);

        // Amplitudes this small can never trip the rescale unit, so the
        // output is the unscaled spectrum in bit-reversed order.
        assert_eq!(d.read(regmap::SCALE_FACTOR).unwrap() & 0xFF, 0);

        let bits = n.trailing_zeros();
        let tolerance = 12.0 * (n as f64).sqrt();
        for (m, out) in d.output(BufferId::A, n).iter().enumerate() {
            let want = reference[bit_reverse(m, bits)];
            approx::assert_abs_diff_eq!(out.re as f64, want.re, epsilon = tolerance);
            approx::assert_abs_diff_eq!(out.im as f64, want.im, epsilon = tolerance);
        }
    }
}

#[test]
fn large_signal_reports_scaling() {
    let n = 256;
    let mut d = FftDevice::new();
    d.load_input(BufferId::A, &vec![FixedComplex::new(29000, 29000); n])
        .unwrap();
    setup(&mut d, n, 0, 0x0F);
    start(&mut d);
    let s = run(&mut d);

    assert_ne!(s & status::DONE, 0);
    assert_ne!(s & status::OVERFLOW, 0);
    let sf = d.read(regmap::SCALE_FACTOR).unwrap();
    assert_ne!(sf & scale::VALID, 0);
    assert_ne!(sf & 0xFF, 0);
    let ovf = d.read(regmap::OVERFLOW_STATUS).unwrap();
    assert_ne!(ovf & 0xFF, 0);
}

#[test]
fn first_stage_overflow_is_attributed() {
    // Two aligned near-full-scale impulses overflow exactly one butterfly
    // in stage 0 and then ride unity twiddles to the end.
    let n = 256;
    let x = FixedComplex::new(32440, 32440);
    let mut input = vec![FixedComplex::ZERO; n];
    input[0] = x;
    input[n / 2] = x;

    let mut d = FftDevice::new();
    d.load_input(BufferId::A, &input).unwrap();
    setup(&mut d, n, 0, 0x0F);
    start(&mut d);
    let s = run(&mut d);
    assert_ne!(s & status::DONE, 0);

    let ovf = d.read(regmap::OVERFLOW_STATUS).unwrap();
    assert_eq!(ovf & 0xFF, 1);
    assert_eq!((ovf >> overflow::LAST_STAGE_SHIFT) & 0xFF, 0);
    assert_eq!((ovf >> overflow::MAX_MAGNITUDE_SHIFT) & 0xFF, (64880u32 >> 8) & 0xFF);
    assert_eq!(d.read(regmap::SCALE_FACTOR).unwrap() & 0xFF, 1);

    // Even bins (the first half in bit-reversed order) carry the halved
    // sum; odd bins cancel exactly.
    let out = d.output(BufferId::A, n);
    for (m, sample) in out.iter().enumerate() {
        if m < n / 2 {
            assert!(
                sample.re >= 32420 && sample.re <= 32440 && sample.im >= 32420,
                "bin {m}: {sample:?}"
            );
        } else {
            assert_eq!(*sample, FixedComplex::ZERO, "bin {m} should cancel");
        }
    }
}

#[test]
fn invalid_length_raises_error_and_reset_recovers() {
    let mut d = FftDevice::new();
    d.write(regmap::FFT_LENGTH, 128).unwrap();
    d.write(regmap::FFT_CONFIG, 7 | config::OVERFLOW_DETECT).unwrap();
    d.write(regmap::RESCALE_CTRL, 0x0F).unwrap();
    start(&mut d);
    let s = run(&mut d);

    assert_ne!(s & status::ERROR, 0);
    assert_eq!(s & status::DONE, 0);
    assert_eq!((s >> status::ERROR_CODE_SHIFT) & status::ERROR_CODE_MASK, 1);
    assert_eq!(d.read(regmap::INT_STATUS).unwrap(), int::ERROR);
    assert_eq!(d.read(regmap::SCALE_FACTOR).unwrap() & scale::VALID, 0);

    // The error latches: another start is refused until reset.
    assert_eq!(
        d.write(regmap::FFT_CTRL, ctrl::START),
        Err(RegError::Busy(regmap::FFT_CTRL))
    );

    d.write(regmap::FFT_CTRL, ctrl::RESET).unwrap();
    let s = d.read(regmap::FFT_STATUS).unwrap();
    assert_eq!(s & (status::ERROR | status::DONE | status::BUSY), 0);
    assert_eq!(d.read(regmap::INT_STATUS).unwrap(), 0);

    setup(&mut d, 256, 0, 0x0F);
    start(&mut d);
    assert_ne!(run(&mut d) & status::DONE, 0);
}

#[test]
fn length_log2_mismatch_is_an_error() {
    let mut d = FftDevice::new();
    d.write(regmap::FFT_LENGTH, 512).unwrap();
    d.write(regmap::FFT_CONFIG, 8 | config::OVERFLOW_DETECT).unwrap();
    start(&mut d);
    let s = run(&mut d);
    assert_ne!(s & status::ERROR, 0);
    assert_eq!((s >> status::ERROR_CODE_SHIFT) & status::ERROR_CODE_MASK, 1);
}

#[test]
fn configuration_is_locked_while_busy() {
    let mut d = FftDevice::new();
    setup(&mut d, 4096, 0, 0x0F);
    start(&mut d);
    for _ in 0..100 {
        d.tick();
    }
    let s = d.read(regmap::FFT_STATUS).unwrap();
    assert_ne!(s & status::BUSY, 0);

    for offset in [regmap::FFT_LENGTH, regmap::FFT_CONFIG, regmap::RESCALE_CTRL] {
        assert_eq!(d.write(offset, 0), Err(RegError::Busy(offset)));
    }
    assert_eq!(
        d.write(regmap::INPUT_A_BASE, 1),
        Err(RegError::Busy(regmap::INPUT_A_BASE))
    );
    assert_eq!(
        d.write(regmap::FFT_CTRL, ctrl::SWAP),
        Err(RegError::Busy(regmap::FFT_CTRL))
    );
    assert_eq!(
        d.write(regmap::BUFFER_SELECT, 1),
        Err(RegError::Busy(regmap::BUFFER_SELECT))
    );

    assert_ne!(run(&mut d) & status::DONE, 0);
    d.write(regmap::FFT_CTRL, ctrl::SWAP).unwrap();
    assert_eq!(d.read(regmap::BUFFER_SELECT).unwrap(), 1);
}

#[test]
fn progress_fields_advance_during_compute() {
    let mut d = FftDevice::new();
    setup(&mut d, 1024, 0, 0x0F);
    start(&mut d);

    let mut seen = std::collections::HashSet::new();
    for _ in 0..2000 {
        d.tick();
        let s = d.read(regmap::FFT_STATUS).unwrap();
        if s & status::BUSY == 0 {
            break;
        }
        let stage = (s >> status::STAGE_SHIFT) & status::STAGE_MASK;
        let butterfly = (s >> status::BUTTERFLY_SHIFT) & status::BUTTERFLY_MASK;
        seen.insert((stage, butterfly));
    }
    assert!(seen.len() > 100, "only {} distinct positions observed", seen.len());
}

#[test]
fn final_divide_by_n_mode_scales_uniformly() {
    let n = 256;
    let mut d = FftDevice::new();
    d.load_input(BufferId::A, &vec![FixedComplex::new(50, 0); n])
        .unwrap();
    setup(&mut d, n, config::FINAL_DIVIDE, 0x0F);
    start(&mut d);
    let s = run(&mut d);
    assert_ne!(s & status::DONE, 0);

    // DC concentrates into bin 0 as 50 * 256, divided back down by N.
    assert_eq!(d.read(regmap::OUTPUT_A_BASE).unwrap(), word(50, 0));
    for k in 1..n as u32 {
        assert_eq!(d.read(regmap::OUTPUT_A_BASE + 4 * k).unwrap(), 0);
    }
    let sf = d.read(regmap::SCALE_FACTOR).unwrap();
    assert_eq!(sf & 0xFF, 8);
    assert_eq!(d.read(regmap::OVERFLOW_STATUS).unwrap() & 0xFF, 0);
}

#[test]
fn detection_threshold_narrows_the_range() {
    let n = 256;
    let input = vec![FixedComplex::new(80, 0); n];

    // At threshold 0 a DC ramp to 80 * 256 never leaves Q1.15.
    let mut d = FftDevice::new();
    d.load_input(BufferId::A, &input).unwrap();
    setup(&mut d, n, 0, 0x0F);
    start(&mut d);
    run(&mut d);
    assert_eq!(d.read(regmap::SCALE_FACTOR).unwrap() & 0xFF, 0);

    // Threshold 7 narrows the detection range to +/-255, so the same
    // signal now rescales on its way up.
    let mut d = FftDevice::new();
    d.load_input(BufferId::A, &input).unwrap();
    setup(&mut d, n, 0, 0x0F | (7 << 4));
    start(&mut d);
    let s = run(&mut d);
    assert_ne!(s & status::DONE, 0);
    assert_ne!(d.read(regmap::SCALE_FACTOR).unwrap() & 0xFF, 0);
    assert_ne!(d.read(regmap::OVERFLOW_STATUS).unwrap() & 0xFF, 0);
}

#[test]
fn saturated_scale_factor_is_flagged() {
    let n = 256;
    let mut d = FftDevice::new();
    d.load_input(BufferId::A, &noise(n, 7, 3000)).unwrap();
    // Threshold 15 treats nearly every sample as overflowing.
    setup(&mut d, n, 0, 0x0F | (15 << 4));
    start(&mut d);
    let s = run(&mut d);

    assert_ne!(s & status::DONE, 0);
    let sf = d.read(regmap::SCALE_FACTOR).unwrap();
    assert_eq!(sf & 0xFF, 0xFF);
    assert_ne!(sf & scale::SATURATED, 0);
}

#[test]
fn all_supported_lengths_complete() {
    for n in [256usize, 512, 1024, 2048, 4096] {
        let mut input = vec![FixedComplex::ZERO; n];
        input[0] = FixedComplex::new(i16::MAX, 0);

        let mut d = FftDevice::new();
        d.load_input(BufferId::A, &input).unwrap();
        setup(&mut d, n, 0, 0x0F);
        start(&mut d);
        let s = run(&mut d);

        assert_ne!(s & status::DONE, 0, "n={n}");
        let sf = d.read(regmap::SCALE_FACTOR).unwrap();
        let stages = (sf >> scale::STAGE_COUNT_SHIFT) & 0xFF;
        assert_eq!(stages, n.trailing_zeros(), "n={n}");
    }
}

#[test]
fn transform_runs_on_the_selected_buffer() {
    let mut d = FftDevice::new();
    d.write(regmap::BUFFER_SELECT, 1).unwrap();
    d.write(regmap::INPUT_B_BASE, word(i16::MAX, 0)).unwrap();
    setup(&mut d, 256, 0, 0x0F);
    start(&mut d);
    let s = run(&mut d);

    assert_ne!(s & status::DONE, 0);
    assert_ne!(s & status::ACTIVE_BUFFER, 0);
    let out = FixedComplex::from_word(d.read(regmap::OUTPUT_B_BASE + 4 * 17).unwrap());
    assert!((out.re as i32 - i16::MAX as i32).abs() <= 8);
    // Buffer A's output region is untouched.
    assert_eq!(d.read(regmap::OUTPUT_A_BASE + 4 * 17).unwrap(), 0);
}

#[test]
fn window_reads_match_block_output() {
    let n = 256;
    let mut d = FftDevice::new();
    d.load_input(BufferId::A, &noise(n, 3, 2000)).unwrap();
    setup(&mut d, n, 0, 0x0F);
    start(&mut d);
    run(&mut d);

    let block: Vec<FixedComplex> = d.output(BufferId::A, n).to_vec();
    for (k, want) in block.iter().enumerate() {
        let got = d.read(regmap::OUTPUT_A_BASE + 4 * k as u32).unwrap();
        assert_eq!(got, want.to_word());
    }
}

#[test]
fn callback_fires_once_per_transform_when_enabled() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let mut d = FftDevice::new();
    d.set_event_callback(Box::new(move |e| sink.lock().unwrap().push(e)));
    d.write(regmap::INT_ENABLE, int::DONE).unwrap();

    setup(&mut d, 256, 0, 0x0F);
    start(&mut d);
    run(&mut d);
    // Keep ticking well past completion: no duplicate delivery.
    for _ in 0..100 {
        d.tick();
    }
    assert_eq!(*events.lock().unwrap(), vec![Event::Done]);

    // Errors are latched in INT_STATUS but not delivered while masked.
    d.write(regmap::INT_STATUS, int::DONE).unwrap();
    d.write(regmap::FFT_LENGTH, 100).unwrap();
    start(&mut d);
    run(&mut d);
    assert_eq!(d.read(regmap::INT_STATUS).unwrap(), int::ERROR);
    assert_eq!(*events.lock().unwrap(), vec![Event::Done]);
}
