use std::thread;

use geometric_control::api::{LinearSystemRequest, NonlinearSystemRequest, Request, Response};
use geometric_control::{Engine, EngineConfig, IntegrationMethod};
use serde_json::{json, Value};

fn handle(engine: &Engine, request: Value) -> Value {
    let response = engine.handle_json(&request.to_string());
    serde_json::to_value(response).unwrap()
}

fn textbook_ddp() -> Value {
    json!({
        "op": "ddp",
        "A": [[1, 1], [0, 2]],
        "B": [[1], [1]],
        "C": [[1, -1]],
        "E": [[1], [1]],
    })
}

#[test]
fn test_ddp_feedback_makes_v_star_invariant() {
    let response = handle(&Engine::default(), textbook_ddp());
    assert_eq!(response["is_solvable"], json!(true));

    let f: Vec<f64> = serde_json::from_value(response["F"][0].clone()).unwrap();
    let v: Vec<f64> = response["V_star"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row[0].as_f64().unwrap())
        .collect();
    // (A + BF) v must stay parallel to v.
    let fv = f[0] * v[0] + f[1] * v[1];
    let w = [v[0] + v[1] + fv, 2.0 * v[1] + fv];
    assert!((w[0] * v[1] - w[1] * v[0]).abs() < 1e-9);
}

#[test]
fn test_ddp_without_e_is_an_error() {
    let mut request = textbook_ddp();
    request.as_object_mut().unwrap().remove("E");
    let response = handle(&Engine::default(), request);
    assert_eq!(response["error"]["kind"], json!("InvalidInput"));
}

#[test]
fn test_simulation_keeps_output_decoupled() {
    let mut request = textbook_ddp();
    request["op"] = json!("simulate");
    let response = handle(&Engine::default(), request);

    assert_eq!(response["is_ddp_solved"], json!(true));
    assert_eq!(response["time"].as_array().unwrap().len(), 1000);
    assert_eq!(response["d"].as_array().unwrap().len(), 1000);
    let peak = response["y"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|row| row.as_array().unwrap().iter())
        .map(|y| y.as_f64().unwrap().abs())
        .fold(0.0, f64::max);
    assert!(peak < 1e-6);
}

#[test]
fn test_simulation_of_decoupling_example() {
    let response = handle(
        &Engine::default(),
        json!({
            "op": "simulate",
            "A": [[0, 1], [2, 0]],
            "B": [[0], [1]],
            "C": [[1, -1]],
            "E": [[1], [1]],
        }),
    );

    assert_eq!(response["is_ddp_solved"], json!(true));
    let time = response["time"].as_array().unwrap();
    assert_eq!(time.len(), 1000);
    assert!((time[999].as_f64().unwrap() - 10.0).abs() < 1e-12);
    let peak = response["y"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|row| row.as_array().unwrap().iter())
        .map(|y| y.as_f64().unwrap().abs())
        .fold(0.0, f64::max);
    assert!(peak < 1e-6, "peak |y| = {peak}");

    let check = handle(
        &Engine::default(),
        json!({
            "op": "ddp",
            "A": [[0, 1], [2, 0]],
            "B": [[0], [1]],
            "C": [[1, -1]],
            "E": [[1], [1]],
        }),
    );
    let f: Vec<f64> = serde_json::from_value(check["F"][0].clone()).unwrap();
    assert!((f[0] + 0.5).abs() < 1e-9 && (f[1] + 0.5).abs() < 1e-9);
}

#[test]
fn test_simulation_respects_config() {
    let mut config = EngineConfig::default();
    config.simulation.steps = 101;
    config.simulation.horizon = 1.0;
    config.simulation.method = IntegrationMethod::Euler;
    let engine = Engine::new(config).unwrap();

    let mut request = textbook_ddp();
    request["op"] = json!("simulate");
    let response = handle(&engine, request);
    let time = response["time"].as_array().unwrap();
    assert_eq!(time.len(), 101);
    assert!((time[100].as_f64().unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn test_pendulum_relative_degree() {
    let response = handle(
        &Engine::default(),
        json!({
            "op": "reldeg",
            "f": ["x2", "-sin(x1)"],
            "g": ["0", "1"],
            "h": "x1",
            "vars": ["x1", "x2"],
        }),
    );
    assert_eq!(response["relative_degree"], json!(2));
    assert_eq!(response["Lg_Lf_h"], json!("1"));
    assert_eq!(response["Lie_derivatives"], json!(["x1", "x2"]));
}

#[test]
fn test_unknown_variable_is_reported() {
    let response = handle(
        &Engine::default(),
        json!({
            "op": "reldeg",
            "f": ["x2", "z"],
            "g": ["0", "1"],
            "h": "x1",
            "vars": ["x1", "x2"],
        }),
    );
    assert_eq!(response["error"]["kind"], json!("UnknownVariable"));
}

#[test]
fn test_deeply_nested_expression_is_a_parse_error() {
    let deep = 200_000;
    let h = format!("{}x1{}", "(".repeat(deep), ")".repeat(deep));
    let response = handle(
        &Engine::default(),
        json!({
            "op": "reldeg",
            "f": ["x2", "0"],
            "g": ["0", "1"],
            "h": h,
            "vars": ["x1", "x2"],
        }),
    );
    assert_eq!(response["error"]["kind"], json!("ParseError"));

    let healthy = handle(&Engine::default(), json!({ "op": "health" }));
    assert!(healthy.get("error").is_none());
}

#[test]
fn test_simulation_is_deterministic() {
    let engine = Engine::default();
    let request = Request::Simulate(LinearSystemRequest {
        a: vec![vec![0., 1.], vec![-2., -3.]],
        b: vec![vec![0.], vec![1.]],
        c: vec![vec![1., 0.]],
        e: Some(vec![vec![1.], vec![0.]]),
    });
    let first = engine.handle(&request);
    let second = engine.handle(&request);
    assert!(!first.is_error());
    assert_eq!(first, second);
}

#[test]
fn test_concurrent_requests_match_sequential() {
    let engine = Engine::default();
    let requests = vec![
        Request::Vstar(LinearSystemRequest {
            a: vec![vec![0., 1., 0.], vec![0., 0., 1.], vec![1., 2., 3.]],
            b: vec![vec![0., 0.], vec![1., 0.], vec![0., 1.]],
            c: vec![vec![1., 0., 0.]],
            e: None,
        }),
        Request::Reldeg(NonlinearSystemRequest {
            f: vec!["x2".into(), "-sin(x1)".into()],
            g: vec!["0".into(), "1".into()],
            h: "x1".into(),
            vars: vec!["x1".into(), "x2".into()],
        }),
        Request::Health,
    ];
    let sequential: Vec<Response> = requests.iter().map(|r| engine.handle(r)).collect();

    let engine = &engine;
    let concurrent: Vec<Response> = thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|request| scope.spawn(move || engine.handle(request)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(sequential, concurrent);
}
