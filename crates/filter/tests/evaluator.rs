use geofes_core::{
    Feature, FeatureCollection, GenericElement, GraphBuilder, NamespaceBindings, NodeGraph, NodeId, PropertyPath,
    PropertyValue, QName, TimeObject, TimePrimitive, TypedValue as V, ValueKind,
};
use geofes_filter::{
    BinaryComparison, BinaryOp, EvalContextBuilder, EvalError, Evaluator, Expression as E, Filter, FilterOperator as Op,
    GraphExtractor, Like, MatchAction, TemporalKind, ValueErrorPolicy, evaluate,
};
use rstest::{fixture, rstest};

struct Roads {
    graph: NodeGraph,
    a1: NodeId,
    b2: NodeId,
    collection: NodeId,
}

#[fixture]
fn roads() -> Roads {
    let mut b = GraphBuilder::new();
    let opened = b.add(TimeObject {
        id: Some("t.a1".into()),
        primitive: TimePrimitive::period("2020-01-01", "2020-01-10").unwrap(),
    });
    let surface = b.add(
        GenericElement::new("surface")
            .attribute(QName::local("grade"), V::text("B"))
            .text(V::text("asphalt")),
    );
    let a1 = b.add(
        Feature::new("Road")
            .with_id("road.a1")
            .property("name", V::text("Main Street"))
            .property("lanes", V::number(4))
            .property("length", V::measure(12, "km"))
            .property("width", V::decimal("155.00").unwrap())
            .property("opened", opened)
            .property("surface", surface)
            .property("toll", V::Boolean(false))
            .property("alias", V::text("A1"))
            .property("alias", V::text("M1"))
            .property("note", PropertyValue::Nil { reason: Some("withheld".into()) })
            .property("ref", V::code("A1", Some("urn:roads"))),
    );
    let b2 = b.add(
        Feature::new("Road")
            .with_id("road.b2")
            .property("name", V::text("Back Lane"))
            .property("lanes", V::text("two"))
            .property("built", V::parse_as(&ValueKind::Date, "1999-05-01").unwrap())
            .property("next", a1),
    );
    let collection = b.add(FeatureCollection { id: Some("roads".into()), members: vec![a1, b2] });
    Roads { graph: b.build().unwrap(), a1, b2, collection }
}

fn eval(roads: &Roads, node: NodeId, op: &Op) -> Result<bool, EvalError> {
    evaluate(op, roads.graph.node_ref(node), &GraphExtractor)
}

#[rstest]
#[case(Op::equal(E::property("name"), E::literal("Main Street")), true)]
#[case(Op::equal(E::property("name"), E::literal("main street")), false)]
#[case(Op::not_equal(E::property("name"), E::literal("Back Lane")), true)]
#[case(Op::greater(E::property("lanes"), E::literal("3")), true)]
#[case(Op::less(E::property("lanes"), E::literal(4)), false)]
#[case(Op::binary(BinaryOp::LessThanOrEqualTo, E::property("lanes"), E::literal(4)), true)]
#[case(Op::equal(E::property("width"), E::literal(155)), true)]
#[case(Op::equal(E::literal("155.00"), E::property("width")), true)]
#[case(Op::greater(E::property("length"), E::literal("11.5")), true)]
#[case(Op::equal(E::property("toll"), E::literal("false")), true)]
#[case(Op::equal(E::property("ref"), E::literal("A1")), true)]
fn binary_comparisons(roads: Roads, #[case] op: Op, #[case] expected: bool) {
    assert_eq!(eval(&roads, roads.a1, &op).unwrap(), expected, "{op}");
}

#[rstest]
fn absent_property_never_matches(roads: Roads) {
    for op in [
        Op::equal(E::property("speed"), E::literal(50)),
        Op::not_equal(E::property("speed"), E::literal(50)),
        Op::between(E::property("speed"), E::literal(0), E::literal(100)),
        Op::like(E::property("speed"), "*"),
        Op::temporal(TemporalKind::After, E::property("speed"), E::from(TimePrimitive::instant("2020-01-01").unwrap())),
    ] {
        assert!(!eval(&roads, roads.a1, &op).unwrap(), "{op}");
    }
}

#[rstest]
#[case(MatchAction::One, false)]
#[case(MatchAction::Any, true)]
#[case(MatchAction::All, false)]
fn multi_valued_property(roads: Roads, #[case] action: MatchAction, #[case] expected: bool) {
    let op: Op = BinaryComparison::new(BinaryOp::EqualTo, E::property("alias"), E::literal("M1"))
        .match_action(action)
        .into();
    assert_eq!(eval(&roads, roads.a1, &op).unwrap(), expected);
}

#[rstest]
fn match_all_requires_every_value(roads: Roads) {
    let op: Op = BinaryComparison::new(BinaryOp::NotEqualTo, E::property("alias"), E::literal("X9"))
        .match_action(MatchAction::All)
        .into();
    assert!(eval(&roads, roads.a1, &op).unwrap());
}

#[rstest]
fn match_case_false_folds_text(roads: Roads) {
    let op: Op = BinaryComparison::new(BinaryOp::EqualTo, E::property("name"), E::literal("MAIN STREET"))
        .match_case(false)
        .into();
    assert!(eval(&roads, roads.a1, &op).unwrap());
}

#[rstest]
#[case("5", true)]
#[case("10", true)]
#[case("4.999", false)]
#[case("10.001", false)]
fn between_is_closed(#[case] value: &str, #[case] expected: bool) {
    let mut b = GraphBuilder::new();
    let f = b.add(Feature::new("Sample").property("v", V::decimal(value).unwrap()));
    let graph = b.build().unwrap();
    let op = Op::between(E::property("v"), E::literal(5), E::literal(10));
    assert_eq!(evaluate(&op, graph.node_ref(f), &GraphExtractor).unwrap(), expected);
}

#[rstest]
fn malformed_coercion_propagates_by_default(roads: Roads) {
    let op = Op::greater(E::property("lanes"), E::literal(1));
    match eval(&roads, roads.b2, &op) {
        Err(EvalError::Value(geofes_core::ValueError::Malformed { raw, target_tag })) => {
            assert_eq!(raw, "two");
            assert_eq!(target_tag, ValueKind::Number);
        }
        other => panic!("expected malformed value error, got {other:?}"),
    }
}

#[rstest]
fn fail_closed_policy_turns_value_errors_into_false(roads: Roads) {
    let ctx = EvalContextBuilder::new().with_value_errors(ValueErrorPolicy::FailClosed).build();
    let evaluator = Evaluator::new(&ctx, &GraphExtractor);
    let op = Op::greater(E::property("lanes"), E::literal(1));
    assert!(!evaluator.evaluate(&op, roads.graph.node_ref(roads.b2)).unwrap());
    let op = Op::equal(E::property("lanes"), E::property("built"));
    assert!(!evaluator.evaluate(&op, roads.graph.node_ref(roads.b2)).unwrap());
}

#[rstest]
fn ordering_unordered_values_is_unsupported(roads: Roads) {
    let op = Op::less(E::property("toll"), E::literal("true"));
    let err = eval(&roads, roads.a1, &op).unwrap_err();
    assert!(matches!(err, EvalError::Unsupported(geofes_filter::ComparisonKind::LessThan)));
    assert!(err.is_not_implemented());

    let op = Op::between(E::property("ref"), E::literal("A0"), E::literal("A9"));
    assert!(matches!(eval(&roads, roads.a1, &op), Err(EvalError::Unsupported(_))));
}

#[rstest]
fn like_on_properties(roads: Roads) {
    assert!(eval(&roads, roads.a1, &Op::like(E::property("name"), "Main*")).unwrap());
    assert!(!eval(&roads, roads.b2, &Op::like(E::property("name"), "Main*")).unwrap());
    let op: Op = Like::new(E::property("name"), "%STREET").meta('%', '_', '!').match_case(false).into();
    assert!(eval(&roads, roads.a1, &op).unwrap());
    // non-text values match on their lexical form
    assert!(eval(&roads, roads.a1, &Op::like(E::property("lanes"), "4")).unwrap());
}

#[rstest]
fn like_requires_literal_pattern(roads: Roads) {
    let mut like = Like::new(E::property("name"), "x");
    like.pattern = E::property("alias");
    let err = eval(&roads, roads.a1, &like.into()).unwrap_err();
    assert!(matches!(err, EvalError::Unsupported(geofes_filter::ComparisonKind::Like)));
}

#[rstest]
fn temporal_operators_on_time_objects_and_dates(roads: Roads) {
    let y2019 = E::from(TimePrimitive::instant("2019-12-31").unwrap());
    assert!(eval(&roads, roads.a1, &Op::temporal(TemporalKind::After, E::property("opened"), y2019.clone())).unwrap());
    assert!(eval(&roads, roads.b2, &Op::temporal(TemporalKind::Before, E::property("built"), y2019)).unwrap());
    // non-time operands fail closed
    let op = Op::temporal(TemporalKind::After, E::property("lanes"), E::literal("2019-12-31"));
    assert!(!eval(&roads, roads.a1, &op).unwrap());
}

#[rstest]
fn ends_is_reported_even_without_data(roads: Roads) {
    let op = Op::temporal(TemporalKind::Ends, E::property("nothing"), E::property("opened"));
    let err = eval(&roads, roads.a1, &op).unwrap_err();
    assert!(matches!(err, EvalError::TemporalNotImplemented(TemporalKind::Ends)));
    assert!(err.is_not_implemented());
}

#[rstest]
fn null_and_nil(roads: Roads) {
    assert!(eval(&roads, roads.a1, &Op::is_null(E::property("speed"))).unwrap());
    assert!(!eval(&roads, roads.a1, &Op::is_null(E::property("name"))).unwrap());
    assert!(eval(&roads, roads.a1, &Op::is_nil(E::property("note"), None)).unwrap());
    assert!(eval(&roads, roads.a1, &Op::is_nil(E::property("note"), Some("withheld"))).unwrap());
    assert!(!eval(&roads, roads.a1, &Op::is_nil(E::property("note"), Some("unknown"))).unwrap());
    assert!(!eval(&roads, roads.a1, &Op::is_nil(E::property("name"), None)).unwrap());
}

#[rstest]
fn descent_into_nested_nodes(roads: Roads) {
    // generic element: first child text
    assert!(eval(&roads, roads.a1, &Op::equal(E::property("surface"), E::literal("asphalt"))).unwrap());
    // referenced feature: its first property
    assert!(eval(&roads, roads.b2, &Op::equal(E::property("next"), E::literal("Main Street"))).unwrap());
}

#[rstest]
fn paths_with_steps_and_attributes(roads: Roads) {
    let ns = NamespaceBindings::new().with("gml", geofes_core::GML_NS);
    let path = |p: &str| E::from(PropertyPath::parse(p, &ns).unwrap());
    let a1 = roads.a1;
    assert!(eval(&roads, a1, &Op::equal(path("surface/@grade"), E::literal("B"))).unwrap());
    assert!(eval(&roads, a1, &Op::equal(path("@gml:id"), E::literal("road.a1"))).unwrap());
    assert!(eval(&roads, a1, &Op::equal(path("alias[2]"), E::literal("M1"))).unwrap());
    assert!(eval(&roads, roads.b2, &Op::equal(path("next/lanes"), E::literal(4))).unwrap());
    assert!(eval(&roads, roads.collection, &Op::equal(path("Road[2]/name"), E::literal("Back Lane"))).unwrap());
}

#[rstest]
fn logical_operators_short_circuit(roads: Roads) {
    // the second operand would raise TemporalNotImplemented if evaluated
    let failing = Op::temporal(TemporalKind::EndedBy, E::property("opened"), E::property("opened"));
    let no = Op::equal(E::property("name"), E::literal("nope"));
    let yes = Op::equal(E::property("name"), E::literal("Main Street"));
    assert!(!eval(&roads, roads.a1, &Op::and([no.clone(), failing.clone()])).unwrap());
    assert!(eval(&roads, roads.a1, &Op::or([yes.clone(), failing.clone()])).unwrap());
    assert!(eval(&roads, roads.a1, &Op::not(no.clone())).unwrap());
    assert!(eval(&roads, roads.a1, &Op::and([yes, failing])).is_err());
    assert!(eval(&roads, roads.a1, &Op::and(Vec::new())).unwrap());
    assert!(!eval(&roads, roads.a1, &Op::or(Vec::new())).unwrap());
}

#[rstest]
fn resource_id_filter(roads: Roads) {
    let ctx = EvalContextBuilder::new().build();
    let evaluator = Evaluator::new(&ctx, &GraphExtractor);
    let filter = Filter::ResourceId(vec!["road.b2".into(), "road.x".into()]);
    assert!(evaluator.evaluate_filter(&filter, roads.graph.node_ref(roads.b2)).unwrap());
    assert!(!evaluator.evaluate_filter(&filter, roads.graph.node_ref(roads.a1)).unwrap());

    let filter = Filter::from(Op::greater(E::property("lanes"), E::literal(2)));
    assert!(evaluator.evaluate_filter(&filter, roads.graph.node_ref(roads.a1)).unwrap());
}

#[rstest]
fn like_patterns_are_reused_across_features(roads: Roads) {
    let ctx = EvalContextBuilder::new().with_like_cache_capacity(1).build();
    let evaluator = Evaluator::new(&ctx, &GraphExtractor);
    let op = Op::like(E::property("name"), "*a?e*");
    assert!(evaluator.evaluate(&op, roads.graph.node_ref(roads.b2)).unwrap());
    assert!(!evaluator.evaluate(&op, roads.graph.node_ref(roads.a1)).unwrap());
    let uncached = EvalContextBuilder::new().with_like_cache_capacity(0).build();
    assert!(Evaluator::new(&uncached, &GraphExtractor).evaluate(&op, roads.graph.node_ref(roads.b2)).unwrap());
}

fn sample(values: &[V]) -> (NodeGraph, NodeId) {
    let mut b = GraphBuilder::new();
    let f = values.iter().fold(Feature::new("Sample"), |f, v| f.property("v", v.clone()));
    let f = b.add(f);
    (b.build().unwrap(), f)
}

#[rstest]
#[case(E::literal(1), E::literal("6"))]
#[case(E::literal(1), E::literal("10"))]
#[case(E::literal("1"), E::literal(10))]
fn between_bounds_of_different_families_are_incompatible(#[case] lower: E, #[case] upper: E) {
    let (graph, f) = sample(&[V::text("5")]);
    let op = Op::between(E::property("v"), lower, upper);
    assert!(matches!(
        evaluate(&op, graph.node_ref(f), &GraphExtractor),
        Err(EvalError::Value(geofes_core::ValueError::Incompatible { .. }))
    ));

    let ctx = EvalContextBuilder::new().with_value_errors(ValueErrorPolicy::FailClosed).build();
    assert!(!Evaluator::new(&ctx, &GraphExtractor).evaluate(&op, graph.node_ref(f)).unwrap());
}

#[rstest]
fn between_reports_bad_upper_bound_below_range() {
    let (graph, f) = sample(&[V::number(0)]);
    let op = Op::between(E::property("v"), E::literal(1), E::literal("ten"));
    assert!(matches!(
        evaluate(&op, graph.node_ref(f), &GraphExtractor),
        Err(EvalError::Value(geofes_core::ValueError::Malformed { .. }))
    ));
}

#[rstest]
fn between_coerces_text_value_into_numeric_bounds() {
    let (graph, f) = sample(&[V::text("5")]);
    let op = Op::between(E::property("v"), E::literal(1), E::literal(10));
    assert!(evaluate(&op, graph.node_ref(f), &GraphExtractor).unwrap());
}

#[rstest]
#[case(MatchAction::Any, &["two", "5"], Some(true))]
#[case(MatchAction::Any, &["two", "1"], None)]
#[case(MatchAction::All, &["two", "1"], Some(false))]
#[case(MatchAction::All, &["4", "two"], None)]
fn match_actions_defer_value_errors(
    #[case] action: MatchAction,
    #[case] values: &[&str],
    #[case] expected: Option<bool>,
) {
    let values: Vec<V> = values.iter().map(|v| V::text(*v)).collect();
    let (graph, f) = sample(&values);
    let op: Op = BinaryComparison::new(BinaryOp::GreaterThan, E::property("v"), E::literal(3))
        .match_action(action)
        .into();
    let result = evaluate(&op, graph.node_ref(f), &GraphExtractor);
    match expected {
        Some(expected) => assert_eq!(result.unwrap(), expected),
        None => assert!(matches!(result, Err(EvalError::Value(geofes_core::ValueError::Malformed { .. })))),
    }
}

#[rstest]
#[case(Op::less(E::property("toll"), E::literal("maybe")), geofes_filter::ComparisonKind::LessThan)]
#[case(Op::greater(E::literal("x"), E::property("ref")), geofes_filter::ComparisonKind::GreaterThan)]
#[case(Op::between(E::property("toll"), E::literal("no"), E::literal(1)), geofes_filter::ComparisonKind::Between)]
fn unordered_family_is_reported_before_coercion(
    roads: Roads,
    #[case] op: Op,
    #[case] kind: geofes_filter::ComparisonKind,
) {
    match eval(&roads, roads.a1, &op) {
        Err(EvalError::Unsupported(k)) => assert_eq!(k, kind),
        other => panic!("expected unsupported {kind}, got {other:?}"),
    }
}
