use viaro_domain::SeatLabel;

use crate::CatalogError;

/// Rows a vehicle floor plan is split into.
pub const SEAT_ROWS: [char; 2] = ['A', 'B'];

/// Deterministically generate the labels for a vehicle with `seat_count`
/// seats: rows "A" then "B", each holding ceil(seat_count / 2) seats
/// numbered from 1, truncated so exactly `seat_count` labels come out.
/// Row "A" gets the extra seat when the count is odd.
///
/// Pure computation; persisting the result is the caller's job.
pub fn generate_labels(seat_count: u32) -> Result<Vec<SeatLabel>, CatalogError> {
    if seat_count == 0 {
        return Err(CatalogError::EmptyLayout);
    }

    let per_row = seat_count.div_ceil(SEAT_ROWS.len() as u32);
    let mut labels = Vec::with_capacity(seat_count as usize);
    'rows: for row in SEAT_ROWS {
        for number in 1..=per_row {
            if labels.len() as u32 == seat_count {
                break 'rows;
            }
            labels.push(SeatLabel::new(row, number));
        }
    }

    Ok(labels)
}
