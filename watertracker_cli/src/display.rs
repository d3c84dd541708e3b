use comfy_table::{presets::NOTHING, *};
use itertools::izip;
use polars::frame::DataFrame;
use watertracker::{
    compare::Comparison, map_frame::MapFrame, metric::Metric, series::CountrySeries, COL,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

fn format_value(value: Option<f64>) -> String {
    value.map(|value| format!("{value:.2}")).unwrap_or_default()
}

fn format_year(value: Option<i32>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

pub fn display_countries(countries: &DataFrame) -> anyhow::Result<()> {
    let mut table = new_table();
    table.set_header(header(&["Country", "ISO3166-1 alpha-3"]));
    for (country, code) in izip!(
        countries.column(COL::COUNTRY)?.str()?,
        countries.column(COL::COUNTRY_CODE)?.str()?,
    ) {
        table.add_row(vec![country.unwrap_or_default(), code.unwrap_or_default()]);
    }
    println!("\n{}", table);
    Ok(())
}

fn metrics_table() -> Table {
    let mut table = new_table();
    table.set_header(header(&[
        "Name",
        "Metric",
        "Forecast key",
        "Record column",
        "Colour",
    ]));
    for metric in Metric::catalog() {
        table.add_row(vec![
            metric.short_name(),
            metric.label(),
            metric.key(),
            metric.record_column(),
            metric.color(),
        ]);
    }
    table
}

pub fn display_metrics() -> anyhow::Result<()> {
    println!("\n{}", metrics_table());
    Ok(())
}

pub fn display_series(series: &CountrySeries) -> anyhow::Result<()> {
    println!("\n{} for {}", series.metric, series.country);
    let mut table = new_table();
    table.set_header(header(&["Year", "Estimate", "Lower bound", "Upper bound"]));
    for (ds, yhat, lower, upper) in izip!(
        series.data.column(COL::DS)?.i32()?,
        series.data.column(COL::YHAT)?.f64()?,
        series.data.column(COL::YHAT_LOWER)?.f64()?,
        series.data.column(COL::YHAT_UPPER)?.f64()?,
    ) {
        table.add_row(vec![
            format_year(ds),
            format_value(yhat),
            format_value(lower),
            format_value(upper),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_comparison(comparison: &Comparison) -> anyhow::Result<()> {
    println!(
        "\n{} ({}), predicted after {}",
        comparison.metric, comparison.mode, comparison.boundary_year
    );
    let mut table = new_table();
    table.set_header(header(&["Country", "Year", "Value", "Segment"]));
    for (segment, df) in [
        ("historical", &comparison.historical),
        ("predicted", &comparison.predicted),
    ] {
        for (country, ds, yhat) in izip!(
            df.column(COL::COUNTRY)?.str()?,
            df.column(COL::DS)?.i32()?,
            df.column(COL::YHAT)?.f64()?,
        ) {
            table.add_row(vec![
                country.unwrap_or_default().to_string(),
                format_year(ds),
                format_value(yhat),
                segment.to_string(),
            ]);
        }
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_map(frame: &MapFrame) -> anyhow::Result<()> {
    println!("\n{}", frame.legend());
    let Some(bins) = frame.bins.as_ref() else {
        if let Some(reason) = frame.empty_reason() {
            println!("{reason}");
        }
        return Ok(());
    };
    let edges = bins.iter().map(|edge| format!("{edge:.1}")).collect::<Vec<_>>();
    println!("Bin edges: {}", edges.join(", "));

    let mut table = new_table();
    table.set_header(header(&["Country", "Code", "Freshwater (m³)", "Mapped value"]));
    for (country, code, freshwater, adjusted) in izip!(
        frame.data.column(COL::COUNTRY)?.str()?,
        frame.data.column(COL::COUNTRY_CODE)?.str()?,
        frame.data.column(COL::FRESHWATER_RESOURCES_PER_CAPITA_M3)?.f64()?,
        frame.data.column(COL::ADJUSTED_FRESHWATER)?.f64()?,
    ) {
        table.add_row(vec![
            country.unwrap_or_default().to_string(),
            code.unwrap_or_default().to_string(),
            format_value(freshwater),
            format_value(adjusted),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_table_should_list_forecast_keys_and_record_columns() {
        let table = metrics_table();
        assert_eq!(table.row_iter().count(), 4);
        let population: Vec<String> = table
            .row_iter()
            .nth(2)
            .unwrap()
            .cell_iter()
            .map(|cell| cell.content())
            .collect();
        assert_eq!(
            population,
            vec![
                "population",
                "Population",
                "Historical_Population",
                COL::POPULATION,
                "firebrick"
            ]
        );
    }
}
