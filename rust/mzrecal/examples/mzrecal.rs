use mzrecal::{
    PeakSet,
    ShiftConfig,
    estimate_linear_shift,
};
use rand::Rng;

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_thread_ids(true)
        .with_thread_names(true)
        .try_init();
}

fn main() {
    println!("Running mass shift estimation example");
    setup_tracing();

    // 1. Generate a reference spectrum
    let mut rng = rand::thread_rng();
    let true_shift_ppm = 7.5;
    let mut reference_positions = Vec::new();
    let mut reference_intensities = Vec::new();
    let mut position = 150.0;
    while position < 1500.0 {
        reference_positions.push(position);
        reference_intensities.push(rng.gen_range(1e3..1e5));
        position += rng.gen_range(0.5..8.0);
    }

    // 2. Observed spectrum: shifted, slightly jittered, plus noise peaks
    let mut positions = Vec::new();
    let mut intensities = Vec::new();
    for (&p, &i) in reference_positions.iter().zip(&reference_intensities) {
        let jitter_ppm = rng.gen_range(-1.0..1.0);
        positions.push(p * (1.0 + (true_shift_ppm + jitter_ppm) * 1e-6));
        intensities.push(i * rng.gen_range(0.8..1.2));
    }
    for _ in 0..100 {
        positions.push(rng.gen_range(150.0..1500.0));
        intensities.push(rng.gen_range(10.0..500.0));
    }

    let reference = match PeakSet::new(reference_positions, reference_intensities) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid reference peaks: {:?}", e);
            return;
        }
    };
    let spectrum = match PeakSet::new(positions, intensities) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid spectrum peaks: {:?}", e);
            return;
        }
    };
    println!(
        "Generated {} reference and {} observed peaks.",
        reference.len(),
        spectrum.len()
    );

    // 3. Estimate the shift
    let config = ShiftConfig {
        plot: true,
        ..Default::default()
    };
    match estimate_linear_shift(&spectrum, &reference, &config) {
        Ok(estimate) => {
            println!(
                "Estimated shift: {:.3} {:?} from {} matches; expected about {}",
                estimate.shift, estimate.unit, estimate.n_matches, true_shift_ppm
            );
            // 4. Recalibrate a few observed peaks
            println!("\n--- Recalibrated positions ---");
            for peak in spectrum.iter().take(5) {
                let corrected = peak.position * (1.0 - estimate.shift * 1e-6);
                println!("- {:.5} -> {:.5}", peak.position, corrected);
            }
        }
        Err(e) => eprintln!("Estimation failed: {:?}", e),
    }

    // Example with an unusable binning
    println!("\n--- Testing error case (zero bins) ---");
    let bad_config = ShiftConfig {
        binning: mzrecal::Binning::Count(0),
        ..Default::default()
    };
    match estimate_linear_shift(&spectrum, &reference, &bad_config) {
        Ok(_) => println!("This should have failed!"),
        Err(e) => eprintln!("Correctly failed with error: {:?}", e),
    }
}
