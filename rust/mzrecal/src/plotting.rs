// ANSI color codes
const COLOR_GRAY: &str = "\x1b[90m";
const COLOR_CYAN: &str = "\x1b[96m";
const COLOR_RED: &str = "\x1b[91m";
const COLOR_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cell {
    Empty,
    Delta,
    Median,
    Zero,
}

/// Prints the sorted delta curve with its median line to the terminal.
///
/// # Example
/// ```
/// use mzrecal::plotting::plot_delta_curve;
/// plot_delta_curve(&[-3.0, -1.0, 0.5, 0.7, 4.0], 0.5, 40, 10);
/// ```
pub fn plot_delta_curve(sorted_deltas: &[f64], median: f64, width: usize, height: usize) {
    println!(
        "\n{}",
        format_delta_curve(sorted_deltas, median, width, height)
    );
}

/// Formats the sorted delta curve as a string for logging or display.
///
/// The x axis is the rank of each delta, the y axis its value. The median is
/// drawn as a horizontal line and zero as a gray axis when it is in range.
pub fn format_delta_curve(
    sorted_deltas: &[f64],
    median: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(2);
    let height = height.max(2);
    let mut output = String::new();

    let n = sorted_deltas.len();
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &y in sorted_deltas.iter().chain(std::iter::once(&median)) {
        if y.is_finite() {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }

    // Handle edge cases
    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = -1.0;
        y_max = 1.0;
    } else if y_min == y_max {
        y_min -= 1.0;
        y_max += 1.0;
    }
    let y_span = y_max - y_min;
    let to_row = |y: f64| -> usize {
        // Row 0 is at the top
        let normalized = (y - y_min) / y_span;
        (((1.0 - normalized) * (height - 1) as f64).round() as usize).min(height - 1)
    };

    let mut grid = vec![vec![Cell::Empty; width]; height];

    if y_min <= 0.0 && y_max >= 0.0 {
        grid[to_row(0.0)].fill(Cell::Zero);
    }
    if median.is_finite() {
        grid[to_row(median)].fill(Cell::Median);
    }

    if n > 0 {
        for col in 0..width {
            let rank = (col as f64 / (width - 1) as f64 * (n - 1) as f64).round() as usize;
            let y = sorted_deltas[rank.min(n - 1)];
            if y.is_finite() {
                grid[to_row(y)][col] = Cell::Delta;
            }
        }
    }

    // Top border
    output.push('╔');
    output.push_str(&"═".repeat(width));
    output.push_str("╗\n");

    for row in &grid {
        output.push('║');
        for cell in row {
            let colored = match cell {
                Cell::Empty => " ".to_string(),
                Cell::Delta => format!("{}●{}", COLOR_CYAN, COLOR_RESET),
                Cell::Median => format!("{}─{}", COLOR_RED, COLOR_RESET),
                Cell::Zero => format!("{}─{}", COLOR_GRAY, COLOR_RESET),
            };
            output.push_str(&colored);
        }
        output.push_str("║\n");
    }

    // Bottom border
    output.push('╚');
    output.push_str(&"═".repeat(width));
    output.push_str("╝\n");

    output.push_str(&format!(
        "\n  Deltas: {}  Y: [{:.2}, {:.2}]  {}─{} median: {:.4}\n",
        n, y_min, y_max, COLOR_RED, COLOR_RESET, median
    ));

    output
}
