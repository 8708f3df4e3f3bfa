//! Combinatorial batches and MAC curves over executed scenarios.

mod common;

use std::collections::BTreeMap;

use approx::assert_relative_eq;

use common::{entity, load_model, opening, periods, scenario, seed_drivers, store};
use strata_core::types::{
    CostProfile, LineItem, ManagementAction, Period, ScenarioActionBinding, Section,
    StatementTemplate, Transformation, Trigger,
};
use strata_engine::{
    compute_mac_curve, generate_all_combinations, generate_diagonal, run_batch, ActionEngine,
    BatchSpec, MacSpec,
};

fn opex_template() -> StatementTemplate {
    let mut template = StatementTemplate::new("CORP", "integrated", 1);
    template
        .insert(
            LineItem::new("REVENUE", "Revenue", Section::ProfitAndLoss)
                .with_driver("driver:REVENUE".parse().unwrap())
                .with_unit("EUR"),
        )
        .unwrap();
    template
        .insert(
            LineItem::new("OPERATING_EXPENSES", "Operating expenses", Section::ProfitAndLoss)
                .with_formula("-300000"),
        )
        .unwrap();
    template
        .insert(
            LineItem::new("NET_INCOME", "Net income", Section::ProfitAndLoss)
                .with_formula("REVENUE + OPERATING_EXPENSES"),
        )
        .unwrap();
    template
}

fn unconditional(action: &str, start: i32) -> ScenarioActionBinding {
    ScenarioActionBinding::new(
        scenario(),
        action,
        Trigger::Unconditional {
            start: Period(start),
            end: None,
        },
    )
}

/// Scenario E: three staggered actions, combinatorial batch; the "all
/// actions" configuration reproduces the composed opex schedule.
#[tokio::test]
async fn combinatorial_batch_composes_staggered_actions() {
    let store = store();
    seed_drivers(
        &store,
        &(1..=10).map(|p| (p, "REVENUE", 500_000.0)).collect::<Vec<_>>(),
    );
    let model = load_model(&store, opex_template()).await;

    let mut bindings = BTreeMap::new();
    bindings.insert(
        "LED".to_string(),
        unconditional("LED", 3).with_transformation(Transformation::FormulaOverride {
            line: "OPERATING_EXPENSES".to_string(),
            formula: "-290000".to_string(),
        }),
    );
    bindings.insert(
        "HEAT".to_string(),
        unconditional("HEAT", 6).with_transformation(Transformation::Add {
            line: "OPERATING_EXPENSES".to_string(),
            amount: 5_000.0,
        }),
    );
    bindings.insert(
        "FLEET".to_string(),
        unconditional("FLEET", 9).with_transformation(Transformation::Add {
            line: "OPERATING_EXPENSES".to_string(),
            amount: -20_000.0,
        }),
    );

    let action_codes: Vec<String> =
        ["LED", "HEAT", "FLEET"].iter().map(|s| s.to_string()).collect();
    let configs = generate_all_combinations(&action_codes);
    assert_eq!(configs.len(), 8);

    let actions = ActionEngine::new();
    let outcomes = run_batch(
        &model,
        &actions,
        &bindings,
        &configs,
        &BatchSpec {
            driver_scenario: scenario(),
            periods: periods(1..=10),
            opening: opening(&[]),
            parallel: true,
        },
    )
    .unwrap();

    assert_eq!(outcomes.len(), 8);
    for outcome in &outcomes {
        assert!(outcome.is_success(), "{}: {:?}", outcome.scenario, outcome.error);
    }

    // The all-actions configuration: overrides then wraps compose in
    // action order. p1-2: -300k, p3-5: -290k, p6-8: -285k, p9-10: -305k.
    let all = outcomes
        .iter()
        .find(|o| o.scenario.as_str() == "LED+HEAT+FLEET")
        .unwrap();
    let opex: Vec<f64> = all
        .results
        .iter()
        .map(|r| r.value("OPERATING_EXPENSES").unwrap())
        .collect();
    let expected = [
        -300_000.0, -300_000.0, -290_000.0, -290_000.0, -290_000.0, -285_000.0, -285_000.0,
        -285_000.0, -305_000.0, -305_000.0,
    ];
    for (got, want) in opex.iter().zip(expected.iter()) {
        assert_relative_eq!(*got, *want, epsilon = 0.01);
    }

    // The baseline configuration never leaves the base template.
    let base = outcomes.iter().find(|o| o.scenario.as_str() == "Base").unwrap();
    assert!(base.results.iter().all(|r| r.template_code == "CORP"));
}

fn carbon_template() -> StatementTemplate {
    let mut template = StatementTemplate::new("CARBON", "integrated", 1);
    template
        .insert(
            LineItem::new("ENERGY_EMISSIONS", "Energy emissions", Section::Carbon)
                .with_driver("driver:ENERGY_EMISSIONS".parse().unwrap())
                .with_unit("tCO2e"),
        )
        .unwrap();
    template
        .insert(
            LineItem::new("FLEET_EMISSIONS", "Fleet emissions", Section::Carbon)
                .with_driver("driver:FLEET_EMISSIONS".parse().unwrap())
                .with_unit("tCO2e"),
        )
        .unwrap();
    template
        .insert(
            LineItem::new("TOTAL_EMISSIONS", "Total emissions", Section::Carbon)
                .with_formula("ENERGY_EMISSIONS + FLEET_EMISSIONS")
                .subtotal(),
        )
        .unwrap();
    template
}

fn mac_action(code: &str, capex: f64, opex: f64) -> ManagementAction {
    ManagementAction {
        code: code.to_string(),
        category: "mitigation".to_string(),
        description: format!("{} measure", code),
        is_mac_relevant: true,
        cost: CostProfile {
            capex,
            opex_annual: opex,
            emission_reduction_annual: 0.0,
            amortization_years: 10,
        },
    }
}

/// Scenario F: MAC from measured reductions, sorted ascending, negative
/// MACs first.
#[tokio::test]
async fn mac_curve_from_executed_scenarios() {
    let store = store();
    store.insert_unit(strata_core::units::UnitDefinition::fixed(
        "tCO2e",
        strata_core::units::UnitCategory::Carbon,
        1.0,
    ));
    store.insert_driver(&entity(), &scenario(), Period(1), "ENERGY_EMISSIONS", 800.0, "tCO2e");
    store.insert_driver(&entity(), &scenario(), Period(1), "FLEET_EMISSIONS", 200.0, "tCO2e");
    let mut model = load_model(&store, carbon_template()).await;
    model
        .actions
        .insert("LED".to_string(), mac_action("LED", 50_000.0, 1_000.0));
    model
        .actions
        .insert("SOLAR".to_string(), mac_action("SOLAR", 100_000.0, -15_000.0));
    model
        .actions
        .insert("EV".to_string(), mac_action("EV", 300_000.0, 2_000.0));

    let mut bindings = BTreeMap::new();
    // LED trims energy emissions by 10%.
    bindings.insert(
        "LED".to_string(),
        unconditional("LED", 1).with_transformation(Transformation::Multiply {
            line: "ENERGY_EMISSIONS".to_string(),
            factor: 0.9,
        }),
    );
    // Solar halves energy emissions and pays for itself.
    bindings.insert(
        "SOLAR".to_string(),
        unconditional("SOLAR", 1).with_transformation(Transformation::Multiply {
            line: "ENERGY_EMISSIONS".to_string(),
            factor: 0.5,
        }),
    );
    // EVs eliminate fleet emissions.
    bindings.insert(
        "EV".to_string(),
        unconditional("EV", 1).with_transformation(Transformation::CarbonFormulaOverride {
            line: "FLEET_EMISSIONS".to_string(),
            formula: "0".to_string(),
        }),
    );

    let actions = ActionEngine::new();
    let curve = compute_mac_curve(
        &model,
        &actions,
        &bindings,
        &MacSpec {
            driver_scenario: scenario(),
            emissions_line: "TOTAL_EMISSIONS".to_string(),
            opening: opening(&[]),
        },
    )
    .unwrap();

    assert_relative_eq!(curve.baseline_emissions, 1_000.0);
    assert_eq!(curve.points.len(), 3);

    // SOLAR: (100000/10 - 15000) / 400 = -12.5 -> negative MAC first.
    // LED: (50000/10 + 1000) / 80 = 75.
    // EV: (300000/10 + 2000) / 200 = 160.
    let macs: Vec<(&str, f64)> = curve
        .points
        .iter()
        .map(|p| (p.action_code.as_str(), p.marginal_cost.unwrap()))
        .collect();
    assert_eq!(macs[0].0, "SOLAR");
    assert_relative_eq!(macs[0].1, -12.5);
    assert_eq!(macs[1].0, "LED");
    assert_relative_eq!(macs[1].1, 75.0);
    assert_eq!(macs[2].0, "EV");
    assert_relative_eq!(macs[2].1, 160.0);

    // Cumulative reduction is strictly increasing.
    assert_relative_eq!(curve.points[0].cumulative_reduction, 400.0);
    assert_relative_eq!(curve.points[1].cumulative_reduction, 480.0);
    assert_relative_eq!(curve.points[2].cumulative_reduction, 680.0);

    // The shadow-input rewrite kept the driver read alive: SOLAR's run
    // measured 400 tCO2e, not the metadata's 0.
    assert!(curve.points.iter().all(|p| p.reduction_tco2e > 0.0));
}

/// Diagonal mode emits baseline + one configuration per action, and the
/// batch runner executes them independently.
#[tokio::test]
async fn diagonal_batch_runs_baseline_and_singles() {
    let store = store();
    seed_drivers(
        &store,
        &(1..=3).map(|p| (p, "REVENUE", 400_000.0)).collect::<Vec<_>>(),
    );
    let model = load_model(&store, opex_template()).await;

    let mut bindings = BTreeMap::new();
    bindings.insert(
        "LED".to_string(),
        unconditional("LED", 1).with_transformation(Transformation::Multiply {
            line: "OPERATING_EXPENSES".to_string(),
            factor: 0.95,
        }),
    );

    let configs = generate_diagonal(&["LED".to_string()]);
    assert_eq!(configs.len(), 2);

    let actions = ActionEngine::new();
    let outcomes = run_batch(
        &model,
        &actions,
        &bindings,
        &configs,
        &BatchSpec {
            driver_scenario: scenario(),
            periods: periods(1..=3),
            opening: opening(&[]),
            parallel: false,
        },
    )
    .unwrap();

    let base_opex = outcomes[0].results[0].value("OPERATING_EXPENSES").unwrap();
    let led_opex = outcomes[1].results[0].value("OPERATING_EXPENSES").unwrap();
    assert_relative_eq!(base_opex, -300_000.0);
    assert_relative_eq!(led_opex, -285_000.0);
}
