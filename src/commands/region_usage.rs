//! Most active regions and services by last month's unblended cost.
//!
//! Two Cost Explorer queries: one grouped by region to rank the top five
//! regions, then one per top region grouped by service. Useful for
//! deciding where the other audits are worth running first.
//!
//! # Usage
//!
//! ```bash
//! aws-exposure region-usage
//! ```

use crate::aws::AwsSession;
use anyhow::{Context, Result};
use aws_sdk_costexplorer::types::{
    DateInterval, Dimension, DimensionValues, Expression, Granularity, GroupDefinition,
    GroupDefinitionType,
};
use chrono::{Datelike, Days, Local, NaiveDate};
use std::cmp::Ordering;

pub async fn run(aws: &AwsSession) -> Result<()> {
    let client = aws_sdk_costexplorer::Client::new(aws.config());
    let (start, end) = previous_month(Local::now().date_naive())
        .context("could not compute the previous month window")?;
    let period = DateInterval::builder()
        .start(start.format("%Y-%m-%d").to_string())
        .end(end.format("%Y-%m-%d").to_string())
        .build()
        .context("failed to build the cost report period")?;

    let by_region = client
        .get_cost_and_usage()
        .time_period(period.clone())
        .granularity(Granularity::Monthly)
        .metrics("UnblendedCost")
        .group_by(
            GroupDefinition::builder()
                .r#type(GroupDefinitionType::Dimension)
                .key("REGION")
                .build(),
        )
        .send()
        .await
        .context("failed to query cost by region")?;

    let top_regions = top_costs(extract_group_costs(by_region.results_by_time()), 5);

    println!("Top 5 Most Active AWS Regions (by cost):");
    for (rank, (region, cost)) in top_regions.iter().enumerate() {
        println!("{}. {}: ${:.2}", rank + 1, region, cost);
    }

    println!("\nTop Services by Cost in Each Region:");
    for (region, _) in &top_regions {
        let by_service = client
            .get_cost_and_usage()
            .time_period(period.clone())
            .granularity(Granularity::Monthly)
            .metrics("UnblendedCost")
            .filter(
                Expression::builder()
                    .dimensions(
                        DimensionValues::builder()
                            .key(Dimension::Region)
                            .values(region.clone())
                            .build(),
                    )
                    .build(),
            )
            .group_by(
                GroupDefinition::builder()
                    .r#type(GroupDefinitionType::Dimension)
                    .key("SERVICE")
                    .build(),
            )
            .send()
            .await
            .with_context(|| format!("failed to query cost by service for {region}"))?;

        let top_services = top_costs(extract_group_costs(by_service.results_by_time()), 5);

        println!("\nRegion: {region}");
        for (rank, (service, cost)) in top_services.iter().enumerate() {
            println!("  {}. {}: ${:.2}", rank + 1, service, cost);
        }
    }
    Ok(())
}

/// The first and last-exclusive day of the month before `today`.
fn previous_month(today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let end = today.with_day(1)?;
    let start = end.checked_sub_days(Days::new(1))?.with_day(1)?;
    Some((start, end))
}

fn extract_group_costs(
    results: &[aws_sdk_costexplorer::types::ResultByTime],
) -> Vec<(String, f64)> {
    let Some(result) = results.first() else {
        return Vec::new();
    };
    result
        .groups()
        .iter()
        .filter_map(|group| {
            let key = group.keys().first()?.clone();
            let amount = group
                .metrics()?
                .get("UnblendedCost")?
                .amount()?
                .parse::<f64>()
                .ok()?;
            Some((key, amount))
        })
        .collect()
}

fn top_costs(mut costs: Vec<(String, f64)>, n: usize) -> Vec<(String, f64)> {
    costs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    costs.truncate(n);
    costs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_month_mid_month() {
        let (start, end) = previous_month(NaiveDate::from_ymd_opt(2025, 8, 14).unwrap()).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 8, 1).unwrap());
    }

    #[test]
    fn test_previous_month_across_year_boundary() {
        let (start, end) = previous_month(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn test_top_costs_sorts_descending_and_truncates() {
        let costs = vec![
            ("us-east-1".to_string(), 10.0),
            ("eu-west-1".to_string(), 250.5),
            ("ap-south-1".to_string(), 31.2),
        ];
        let top = top_costs(costs, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, "eu-west-1");
        assert_eq!(top[1].0, "ap-south-1");
    }
}
