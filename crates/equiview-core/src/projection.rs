//! Chart series and headline cards derived from summary statistics
//!
//! Projections keep raw numbers; units and two-decimal formatting are only
//! attached by the `*_text` helpers at render time.

use crate::models::SummaryStatistics;

/// One of the three averaged measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Flowrate,
    Pressure,
    Temperature,
}

impl Parameter {
    pub const ALL: [Parameter; 3] = [Parameter::Flowrate, Parameter::Pressure, Parameter::Temperature];

    pub fn label(&self) -> &'static str {
        match self {
            Parameter::Flowrate => "Flowrate",
            Parameter::Pressure => "Pressure",
            Parameter::Temperature => "Temperature",
        }
    }

    /// Unit suffix including its leading space
    pub fn unit_suffix(&self) -> &'static str {
        match self {
            Parameter::Flowrate => " L/min",
            Parameter::Pressure => " bar",
            Parameter::Temperature => " °C",
        }
    }

    fn mean_of(&self, summary: &SummaryStatistics) -> f64 {
        match self {
            Parameter::Flowrate => summary.avg_flowrate,
            Parameter::Pressure => summary.avg_pressure,
            Parameter::Temperature => summary.avg_temperature,
        }
    }
}

/// Bar of the type distribution chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionPoint {
    pub label: String,
    pub count: u64,
}

/// Point of the average parameters chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterPoint {
    pub parameter: Parameter,
    pub value: f64,
}

impl ParameterPoint {
    pub fn tooltip_text(&self) -> String {
        format!("Average Values: {:.2}{}", self.value, self.parameter.unit_suffix())
    }
}

/// Value shown on a headline card
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CardValue {
    Count(u64),
    Mean(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryCard {
    pub title: &'static str,
    pub value: CardValue,
    pub unit: &'static str,
}

impl SummaryCard {
    pub fn value_text(&self) -> String {
        match self.value {
            CardValue::Count(n) => n.to_string(),
            CardValue::Mean(v) => format!("{:.2}", v),
        }
    }
}

/// Everything the summary cards and both charts render
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryProjection {
    pub distribution: Vec<DistributionPoint>,
    pub parameters: [ParameterPoint; 3],
    pub cards: [SummaryCard; 4],
}

impl SummaryProjection {
    /// True when the charts should show their "no data" state
    pub fn is_empty(&self) -> bool {
        self.distribution.is_empty() || self.total_count() == 0
    }

    pub fn total_count(&self) -> u64 {
        match self.cards[0].value {
            CardValue::Count(n) => n,
            CardValue::Mean(_) => 0,
        }
    }
}

/// Project a summary into chart series and cards
///
/// Returns `None` until a summary exists, so absent data renders nothing
/// rather than zeros. An empty dataset projects to zero-valued parameters.
pub fn project(summary: Option<&SummaryStatistics>) -> Option<SummaryProjection> {
    let summary = summary?;
    let empty = summary.is_empty();
    let mean = |p: Parameter| if empty { 0.0 } else { p.mean_of(summary) };

    let distribution = summary
        .type_distribution
        .iter()
        .map(|t| DistributionPoint {
            label: t.label.clone(),
            count: t.count,
        })
        .collect();

    let parameters = Parameter::ALL.map(|parameter| ParameterPoint {
        parameter,
        value: mean(parameter),
    });

    let cards = [
        SummaryCard {
            title: "Total Equipment",
            value: CardValue::Count(summary.total_count),
            unit: "items",
        },
        SummaryCard {
            title: "Average Flowrate",
            value: CardValue::Mean(mean(Parameter::Flowrate)),
            unit: "L/min",
        },
        SummaryCard {
            title: "Average Pressure",
            value: CardValue::Mean(mean(Parameter::Pressure)),
            unit: "bar",
        },
        SummaryCard {
            title: "Average Temperature",
            value: CardValue::Mean(mean(Parameter::Temperature)),
            unit: "°C",
        },
    ];

    Some(SummaryProjection {
        distribution,
        parameters,
        cards,
    })
}
