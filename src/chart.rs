//! Renders the balance-over-time chart as a standalone ECharts HTML page.

use std::fs;
use std::path::Path;

use charming::{
    component::{Axis, Grid, Title},
    element::{AreaStyle, AxisLabel, AxisType, JsFunction, Tooltip, Trigger},
    series::Line,
    Chart,
};
use rust_decimal::prelude::ToPrimitive;

use crate::error::Error;
use crate::ingest::Transaction;

const CHART_DATE_FORMAT: &str = "%d-%b-%Y";
const ECHARTS_CDN: &str = "https://cdn.jsdelivr.net/npm/echarts@5/dist/echarts.min.js";

/// Builds the balance line chart over the normalized ledger. The ledger is
/// already chronological, so the rows plot left to right as-is.
/// `label_interval` thins the x-axis date labels, mirroring the configured
/// graph interval.
pub fn balance_chart(ledger: &[Transaction], currency: &str, label_interval: u32) -> Chart {
    let labels = date_labels(ledger);
    let values = balance_values(ledger);
    // Only every Nth category label is drawn; an interval of zero or one
    // keeps them all.
    let interval = label_interval.max(1);

    Chart::new()
        .title(Title::new().text("Balance Over Time"))
        .tooltip(Tooltip::new().trigger(Trigger::Axis))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(labels)
                .axis_label(AxisLabel::new().formatter(JsFunction::new_with_args(
                    "value, index",
                    &format!("return index % {interval} === 0 ? value : '';"),
                ))),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .name(format!("Balance in {currency}")),
        )
        .series(
            Line::new()
                .name("Balance")
                .area_style(AreaStyle::new())
                .data(values),
        )
}

/// Writes the chart as a self-contained HTML page.
pub fn write_html(chart: &Chart, file: &Path) -> Result<(), Error> {
    fs::write(file, render_page(chart))?;
    Ok(())
}

fn render_page(chart: &Chart) -> String {
    let options = chart.to_string();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Balance Over Time</title>
<script src="{ECHARTS_CDN}"></script>
</head>
<body>
<div id="chart" style="width: 1000px; height: 600px;"></div>
<script>
const chart = echarts.init(document.getElementById('chart'));
chart.setOption({options});
window.addEventListener('resize', chart.resize);
</script>
</body>
</html>
"#
    )
}

fn date_labels(ledger: &[Transaction]) -> Vec<String> {
    ledger
        .iter()
        .map(|transaction| transaction.date.format(CHART_DATE_FORMAT).to_string())
        .collect()
}

fn balance_values(ledger: &[Transaction]) -> Vec<f64> {
    ledger
        .iter()
        .map(|transaction| transaction.balance.to_f64().unwrap_or_default())
        .collect()
}
