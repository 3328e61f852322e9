//! CSV export of batch results, one row per item plus a portfolio row.

use std::io::Write;

use crate::batch::BatchResult;
use crate::simulator::AggregateResult;

fn percentile_header(percentile: f64) -> String {
    format!("p{percentile}_cost")
}

fn aggregate_cells(result: &AggregateResult, percentiles: &[f64]) -> Vec<String> {
    let mut cells = vec![
        result.expected_cost.to_string(),
        format!("{:.4}", result.expected_destructions),
        format!("{:.2}", result.expected_attempts),
    ];
    cells.extend(percentiles.iter().map(|p| {
        result
            .percentile_cost(*p)
            .map(|cost| cost.to_string())
            .unwrap_or_default()
    }));
    cells
}

pub fn write_batch_csv<W: Write>(result: &BatchResult, writer: W) -> Result<(), csv::Error> {
    let percentiles: Vec<f64> = result
        .portfolio
        .percentiles
        .iter()
        .map(|outcome| outcome.percentile)
        .collect();

    let mut out = csv::Writer::from_writer(writer);
    let mut header = vec![
        "id".to_string(),
        "name".to_string(),
        "included".to_string(),
        "star_force_cost".to_string(),
        "potential_cost".to_string(),
        "expected_cost".to_string(),
        "expected_destructions".to_string(),
        "expected_attempts".to_string(),
    ];
    header.extend(percentiles.iter().map(|p| percentile_header(*p)));
    out.write_record(&header)?;

    for item in &result.items {
        let mut row = vec![
            item.id.clone(),
            item.name.clone().unwrap_or_default(),
            item.included.to_string(),
            item.star_force
                .as_ref()
                .map(|r| r.expected_cost.to_string())
                .unwrap_or_default(),
            item.potential
                .as_ref()
                .map(|r| r.result.expected_cost.to_string())
                .unwrap_or_default(),
        ];
        row.extend(aggregate_cells(&item.total, &percentiles));
        out.write_record(&row)?;
    }

    let mut total = vec![
        "portfolio".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
    ];
    total.extend(aggregate_cells(&result.portfolio, &percentiles));
    out.write_record(&total)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{calculate_batch, BatchOptions, ItemDescriptor, StarForceGoal};
    use crate::starforce::{Modifiers, TierSystem};

    #[test]
    fn writes_item_rows_and_portfolio_row() {
        let goal = StarForceGoal {
            current_tier: 0,
            target_tier: 10,
            tier_system: TierSystem::Legacy,
            modifiers: Modifiers::default(),
            replacement_cost: 0,
        };
        let items = vec![
            ItemDescriptor::new("hat", 150).with_star_force(goal),
            ItemDescriptor::new("top", 150).with_star_force(goal),
        ];
        let options = BatchOptions {
            trials: Some(50),
            ..BatchOptions::default()
        };
        let result = calculate_batch(&items, &options).unwrap();

        let mut buffer = Vec::new();
        write_batch_csv(&result, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("id,name,included,star_force_cost"));
        assert!(lines[0].ends_with("p50_cost,p75_cost,p95_cost"));
        assert!(lines[1].starts_with("hat,,true,"));
        assert!(lines[3].starts_with(&format!(
            "portfolio,,,,,{}",
            result.portfolio.expected_cost
        )));
    }
}
