//! Row/column clustering of positioned text fragments.
//!
//! Groups one page's [`TextRun`]s into candidate table regions by y-scan row
//! formation followed by x-position column clustering. Candidates are
//! unvalidated; the validator decides which are genuine tables.

use clinex_core::config::LayoutConfig;
use clinex_core::geometry::BoundingBox;
use clinex_core::types::TextRun;

/// One clustered row of fragments, sorted left to right.
#[derive(Debug, Clone)]
pub struct RowCluster {
    /// The y of the run that opened this row
    pub representative_y: f64,
    /// Member fragments, sorted by x
    pub runs: Vec<TextRun>,
}

impl RowCluster {
    fn new(first: TextRun) -> Self {
        Self {
            representative_y: first.y,
            runs: vec![first],
        }
    }
}

/// An unvalidated candidate table region.
#[derive(Debug, Clone)]
pub struct TableCandidate {
    /// Column x-positions (cluster means), strictly ascending
    pub column_positions: Vec<f64>,
    /// Cell grid including the header row, aligned to `column_positions`
    pub grid: Vec<Vec<String>>,
    /// Union of all member fragment boxes
    pub bounding_box: BoundingBox,
}

/// Cluster a page's fragments into rows.
///
/// Fragments are sorted by `y` and scanned in order; a new row opens whenever
/// the running fragment's `y` differs from the current row's representative
/// `y` by more than the row tolerance.
#[must_use]
pub fn cluster_rows(runs: &[TextRun], config: &LayoutConfig) -> Vec<RowCluster> {
    let mut sorted: Vec<TextRun> = runs.to_vec();
    sorted.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut rows: Vec<RowCluster> = Vec::new();
    for run in sorted {
        match rows.last_mut() {
            Some(row) if (run.y - row.representative_y).abs() <= config.row_tolerance_px => {
                row.runs.push(run);
            }
            _ => rows.push(RowCluster::new(run)),
        }
    }

    for row in &mut rows {
        row.runs.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    rows
}

/// Find candidate table regions among clustered rows.
///
/// A candidate is a maximal run of adjacent multi-fragment rows whose
/// fragment count is stable (±1 between neighbors) and whose length meets
/// the minimum-row threshold. Pages with zero or one fragment, and rows with
/// a single fragment, never contribute.
#[must_use]
pub fn find_candidates(rows: &[RowCluster], config: &LayoutConfig) -> Vec<TableCandidate> {
    let mut candidates = Vec::new();
    let mut start = 0;

    while start < rows.len() {
        if rows[start].runs.len() < 2 {
            start += 1;
            continue;
        }

        let mut end = start + 1;
        while end < rows.len()
            && rows[end].runs.len() >= 2
            && rows[end].runs.len().abs_diff(rows[end - 1].runs.len()) <= 1
        {
            end += 1;
        }

        if end - start >= config.min_table_rows {
            candidates.push(build_candidate(&rows[start..end], config));
        }
        start = end;
    }

    candidates
}

/// Cluster the region's x positions and materialize the aligned cell grid.
fn build_candidate(rows: &[RowCluster], config: &LayoutConfig) -> TableCandidate {
    // Running (sum, count) per column cluster; position is the member mean.
    let mut clusters: Vec<(f64, usize)> = Vec::new();
    for row in rows {
        for run in &row.runs {
            let assigned = clusters
                .iter_mut()
                .find(|(sum, count)| (run.x - *sum / *count as f64).abs() <= config.column_tolerance_px);
            match assigned {
                Some((sum, count)) => {
                    *sum += run.x;
                    *count += 1;
                }
                None => clusters.push((run.x, 1)),
            }
        }
    }

    let mut column_positions: Vec<f64> = clusters
        .iter()
        .map(|(sum, count)| sum / *count as f64)
        .collect();
    column_positions.sort_by(f64::total_cmp);
    column_positions.dedup();

    let grid = rows
        .iter()
        .map(|row| align_row(row, &column_positions))
        .collect();

    let mut bounding_box = rows[0].runs[0].bounding_box();
    for row in rows {
        for run in &row.runs {
            bounding_box = bounding_box.union(&run.bounding_box());
        }
    }

    TableCandidate {
        column_positions,
        grid,
        bounding_box,
    }
}

/// Map one row's fragments onto the column grid; fragments sharing a column
/// are joined with a space, unmatched columns stay empty.
fn align_row(row: &RowCluster, column_positions: &[f64]) -> Vec<String> {
    let mut cells = vec![String::new(); column_positions.len()];
    for run in &row.runs {
        let column = nearest_column(run.x, column_positions);
        if cells[column].is_empty() {
            cells[column] = run.text.clone();
        } else {
            cells[column].push(' ');
            cells[column].push_str(&run.text);
        }
    }
    cells
}

fn nearest_column(x: f64, column_positions: &[f64]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (idx, position) in column_positions.iter().enumerate() {
        let distance = (x - position).abs();
        if distance < best_distance {
            best = idx;
            best_distance = distance;
        }
    }
    best
}
