//! Declaration parsers (keyword-dispatched).
//!
//! One parse function per grammar rule. Dispatch happens on the current
//! token at the grammar's fixed alternation points; nothing backtracks.

use crate::error::ParseError;
use crate::stream::TokenStream;
use reflex_ast::{
    App, BindingDecl, BindingTarget, CircuitDecl, Declaration, EffectorDecl, EncoderDecl,
    FeatureOp, Guard, LearningRule, ModulatorDecl, PatternPart, PlasticityDecl, PlasticityParam,
    PopulationDecl, ProjectionDecl, RegionDecl, RuntimeDecl, SensorDecl, SensorPattern, Step,
    TickSpec, Topology, UnitCount, WeightInit,
};
use reflex_lexer::{TimeValue, Token};

/// Parse the `app <Name> { declaration* }` program rule.
///
/// Collects one error per failed declaration, synchronizing to the next
/// declaration keyword, and fails the whole parse if anything went wrong.
pub fn parse_app(stream: &mut TokenStream) -> Result<App, Vec<ParseError>> {
    let start = stream.current_pos();
    stream.expect(Token::App).map_err(|e| vec![e])?;
    let name = expect_ident(stream).map_err(|e| vec![e])?;
    stream.expect(Token::LBrace).map_err(|e| vec![e])?;

    let mut declarations = Vec::new();
    let mut errors = Vec::new();

    while !stream.at_end() && !stream.check(&Token::RBrace) {
        match parse_declaration(stream) {
            Ok(decl) => declarations.push(decl),
            Err(e) => {
                errors.push(e);
                stream.synchronize();
            }
        }
    }

    if let Err(e) = stream.expect(Token::RBrace) {
        errors.push(e);
    }
    if !stream.at_end() {
        errors.push(ParseError::unexpected_token(
            stream.peek(),
            "after the closing `}` of the app block",
            stream.current_span(),
        ));
    }

    if errors.is_empty() {
        Ok(App {
            name,
            declarations,
            span: stream.span_from(start),
        })
    } else {
        Err(errors)
    }
}

/// Parse a single declaration (keyword-dispatched).
fn parse_declaration(stream: &mut TokenStream) -> Result<Declaration, ParseError> {
    match stream.peek() {
        Some(Token::Sensor) => parse_sensor(stream).map(Declaration::Sensor),
        Some(Token::Encoder) => parse_encoder(stream).map(Declaration::Encoder),
        Some(Token::Region) => parse_region(stream).map(Declaration::Region),
        Some(Token::Circuit) => parse_circuit(stream).map(Declaration::Circuit),
        Some(Token::Modulator) => parse_modulator(stream).map(Declaration::Modulator),
        Some(Token::Effector) => parse_effector(stream).map(Declaration::Effector),
        Some(Token::Runtime) => parse_runtime(stream).map(Declaration::Runtime),
        other => Err(ParseError::unexpected_token(
            other,
            "at declaration",
            stream.current_span(),
        )),
    }
}

// === Sensor ===

/// `sensor <Name> : events(A, B, C)`
fn parse_sensor(stream: &mut TokenStream) -> Result<SensorDecl, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Sensor)?;
    let name = expect_ident(stream)?;
    stream.expect(Token::Colon)?;
    stream.expect(Token::Events)?;
    stream.expect(Token::LParen)?;
    let event_types = parse_identifier_list(stream)?;
    stream.expect(Token::RParen)?;
    Ok(SensorDecl {
        name,
        event_types,
        span: stream.span_from(start),
    })
}

// === Encoder ===

/// `encoder <Name> { in = [...] out = FeatureVector dim=N policy = { ... } }`
fn parse_encoder(stream: &mut TokenStream) -> Result<EncoderDecl, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Encoder)?;
    let name = expect_ident(stream)?;
    stream.expect(Token::LBrace)?;

    stream.expect(Token::In)?;
    stream.expect(Token::Equals)?;
    stream.expect(Token::LBracket)?;
    let mut inputs = vec![parse_sensor_pattern(stream)?];
    while stream.eat(&Token::Comma) {
        inputs.push(parse_sensor_pattern(stream)?);
    }
    stream.expect(Token::RBracket)?;

    stream.expect(Token::Out)?;
    stream.expect(Token::Equals)?;
    stream.expect(Token::FeatureVector)?;
    stream.expect(Token::Dim)?;
    stream.expect(Token::Equals)?;
    let dim = expect_u32(stream)?;

    stream.expect(Token::Policy)?;
    stream.expect(Token::Equals)?;
    stream.expect(Token::LBrace)?;
    let mut policy = Vec::new();
    while !stream.check(&Token::RBrace) {
        policy.push(parse_feature_op(stream)?);
    }
    stream.expect(Token::RBrace)?;
    stream.expect(Token::RBrace)?;

    Ok(EncoderDecl {
        name,
        inputs,
        dim,
        policy,
        span: stream.span_from(start),
    })
}

/// `(Ident | *) . (Ident | *)` — wildcard sides disambiguated by position.
fn parse_sensor_pattern(stream: &mut TokenStream) -> Result<SensorPattern, ParseError> {
    let sensor = parse_pattern_part(stream)?;
    stream.expect(Token::Dot)?;
    let event = parse_pattern_part(stream)?;
    Ok(SensorPattern { sensor, event })
}

fn parse_pattern_part(stream: &mut TokenStream) -> Result<PatternPart, ParseError> {
    let span = stream.current_span();
    match stream.advance() {
        Some(Token::Star) => Ok(PatternPart::Any),
        Some(Token::Ident(name)) => Ok(PatternPart::Named(name.clone())),
        other => Err(ParseError::unexpected_token(
            other,
            "in sensor pattern",
            span,
        )),
    }
}

/// One feature op: `onehot(f)`, `bucket(f, N)`, `hash(f, N)`, `numeric(f)`,
/// `clamp(f, lo, hi)`, `scale(f, k)`.
fn parse_feature_op(stream: &mut TokenStream) -> Result<FeatureOp, ParseError> {
    match stream.peek() {
        Some(Token::Onehot) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let field = expect_ident(stream)?;
            stream.expect(Token::RParen)?;
            Ok(FeatureOp::Onehot { field })
        }
        Some(Token::Bucket) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let field = expect_ident(stream)?;
            stream.expect(Token::Comma)?;
            let bins = expect_u32(stream)?;
            stream.expect(Token::RParen)?;
            Ok(FeatureOp::Bucket { field, bins })
        }
        Some(Token::Hash) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let field = expect_ident(stream)?;
            stream.expect(Token::Comma)?;
            let buckets = expect_u32(stream)?;
            stream.expect(Token::RParen)?;
            Ok(FeatureOp::Hash { field, buckets })
        }
        Some(Token::Numeric) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let field = expect_ident(stream)?;
            stream.expect(Token::RParen)?;
            Ok(FeatureOp::Numeric { field })
        }
        Some(Token::Clamp) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let field = expect_ident(stream)?;
            stream.expect(Token::Comma)?;
            let min = expect_number(stream)?;
            stream.expect(Token::Comma)?;
            let max = expect_number(stream)?;
            stream.expect(Token::RParen)?;
            Ok(FeatureOp::Clamp { field, min, max })
        }
        Some(Token::Scale) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let field = expect_ident(stream)?;
            stream.expect(Token::Comma)?;
            let factor = expect_number(stream)?;
            stream.expect(Token::RParen)?;
            Ok(FeatureOp::Scale { field, factor })
        }
        other => Err(ParseError::unexpected_token(
            other,
            "in encoder policy",
            stream.current_span(),
        )),
    }
}

// === Region ===

/// `region <Name> { (population | projection)* }`
fn parse_region(stream: &mut TokenStream) -> Result<RegionDecl, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Region)?;
    let name = expect_ident(stream)?;
    stream.expect(Token::LBrace)?;

    let mut populations = Vec::new();
    let mut projections = Vec::new();
    loop {
        match stream.peek() {
            Some(Token::Population) => populations.push(parse_population(stream)?),
            Some(Token::Projection) => projections.push(parse_projection(stream)?),
            Some(Token::RBrace) => break,
            other => {
                return Err(ParseError::unexpected_token(
                    other,
                    "in region body",
                    stream.current_span(),
                ));
            }
        }
    }
    stream.expect(Token::RBrace)?;

    Ok(RegionDecl {
        name,
        populations,
        projections,
        span: stream.span_from(start),
    })
}

// === Population ===

/// `population <Name> : <kind>(...)` — five mutually exclusive shapes.
fn parse_population(stream: &mut TokenStream) -> Result<PopulationDecl, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Population)?;
    let name = expect_ident(stream)?;
    stream.expect(Token::Colon)?;

    match stream.peek() {
        Some(Token::State) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            stream.expect(Token::Slots)?;
            stream.expect(Token::Equals)?;
            let slots = expect_u32(stream)?;
            stream.expect(Token::Comma)?;
            stream.expect(Token::Decay)?;
            stream.expect(Token::Equals)?;
            let decay = expect_time(stream)?;
            stream.expect(Token::Comma)?;
            stream.expect(Token::Merge)?;
            stream.expect(Token::Equals)?;
            let merge = expect_string(stream)?;
            stream.expect(Token::RParen)?;
            Ok(PopulationDecl::State {
                name,
                slots,
                decay,
                merge,
                span: stream.span_from(start),
            })
        }
        Some(Token::Spiking) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            stream.expect(Token::Neurons)?;
            stream.expect(Token::Equals)?;
            let neurons = expect_u32(stream)?;
            stream.expect(Token::Comma)?;
            stream.expect(Token::Neuron)?;
            stream.expect(Token::Equals)?;
            stream.expect(Token::Lif)?;
            stream.expect(Token::LParen)?;
            expect_param(stream, "tau")?;
            let tau = expect_time(stream)?;
            stream.expect(Token::Comma)?;
            expect_param(stream, "refr")?;
            let refr = expect_time(stream)?;
            stream.expect(Token::RParen)?;
            stream.expect(Token::Comma)?;
            stream.expect(Token::TargetRate)?;
            stream.expect(Token::Equals)?;
            let target_rate = expect_number(stream)?;
            stream.expect(Token::Comma)?;
            stream.expect(Token::Inhibition)?;
            stream.expect(Token::Equals)?;
            let inhibition = expect_string(stream)?;
            stream.expect(Token::RParen)?;
            Ok(PopulationDecl::Spiking {
                name,
                neurons,
                tau,
                refr,
                target_rate,
                inhibition,
                span: stream.span_from(start),
            })
        }
        Some(Token::Recurrent) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            stream.expect(Token::Neurons)?;
            stream.expect(Token::Equals)?;
            let neurons = expect_u32(stream)?;
            stream.expect(Token::Comma)?;
            stream.expect(Token::Dt)?;
            stream.expect(Token::Equals)?;
            let dt = expect_time(stream)?;
            stream.expect(Token::RParen)?;
            Ok(PopulationDecl::Recurrent {
                name,
                neurons,
                dt,
                span: stream.span_from(start),
            })
        }
        Some(Token::Rate) => {
            stream.advance();
            let units = parse_units_arg(stream)?;
            Ok(PopulationDecl::Rate {
                name,
                units,
                span: stream.span_from(start),
            })
        }
        Some(Token::WinnerTakeAll) => {
            stream.advance();
            let units = parse_units_arg(stream)?;
            Ok(PopulationDecl::WinnerTakeAll {
                name,
                units,
                span: stream.span_from(start),
            })
        }
        other => Err(ParseError::unexpected_token(
            other,
            "as population kind",
            stream.current_span(),
        )),
    }
}

/// `( units = N | len(Ident) )`
fn parse_units_arg(stream: &mut TokenStream) -> Result<UnitCount, ParseError> {
    stream.expect(Token::LParen)?;
    stream.expect(Token::Units)?;
    stream.expect(Token::Equals)?;
    let units = if stream.check(&Token::Len) {
        stream.advance();
        stream.expect(Token::LParen)?;
        // `len(actions)` is the common case and `actions` lexes as a keyword.
        let span = stream.current_span();
        let target = match stream.advance() {
            Some(Token::Actions) => "actions".to_string(),
            Some(Token::Ident(name)) => name.clone(),
            other => {
                return Err(ParseError::unexpected_token(
                    other,
                    "as len() target",
                    span,
                ));
            }
        };
        stream.expect(Token::RParen)?;
        UnitCount::LenOf(target)
    } else {
        UnitCount::Literal(expect_u32(stream)?)
    };
    stream.expect(Token::RParen)?;
    Ok(units)
}

// === Projection ===

/// `projection <from> -> <to> { topology = ... [weight_init = ...] [rule = ...] }`
fn parse_projection(stream: &mut TokenStream) -> Result<ProjectionDecl, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Projection)?;
    let from = parse_qualified_name(stream)?;
    stream.expect(Token::Arrow)?;
    let to = parse_qualified_name(stream)?;
    stream.expect(Token::LBrace)?;

    stream.expect(Token::Topology)?;
    stream.expect(Token::Equals)?;
    let topology = parse_topology(stream)?;

    let weight_init = if stream.check(&Token::WeightInit) {
        stream.advance();
        stream.expect(Token::Equals)?;
        Some(parse_weight_init(stream)?)
    } else {
        None
    };

    let rule = if stream.check(&Token::Rule) {
        stream.advance();
        stream.expect(Token::Equals)?;
        Some(parse_learning_rule(stream)?)
    } else {
        None
    };

    stream.expect(Token::RBrace)?;

    Ok(ProjectionDecl {
        from,
        to,
        topology,
        weight_init,
        rule,
        span: stream.span_from(start),
    })
}

fn parse_topology(stream: &mut TokenStream) -> Result<Topology, ParseError> {
    match stream.peek() {
        Some(Token::Dense) => {
            stream.advance();
            Ok(Topology::Dense)
        }
        Some(Token::Linear) => {
            stream.advance();
            Ok(Topology::Linear)
        }
        Some(Token::SparseRandom) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            expect_param(stream, "p")?;
            let p = expect_number(stream)?;
            stream.expect(Token::Comma)?;
            expect_param(stream, "seed")?;
            let seed = expect_u32(stream)?;
            stream.expect(Token::RParen)?;
            Ok(Topology::SparseRandom { p, seed })
        }
        Some(Token::Local) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            expect_param(stream, "radius")?;
            let radius = expect_u32(stream)?;
            stream.expect(Token::RParen)?;
            Ok(Topology::Local { radius })
        }
        Some(Token::Softmax) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            expect_param(stream, "temp")?;
            let temperature = expect_number(stream)?;
            stream.expect(Token::RParen)?;
            Ok(Topology::Softmax { temperature })
        }
        other => Err(ParseError::unexpected_token(
            other,
            "as projection topology",
            stream.current_span(),
        )),
    }
}

fn parse_weight_init(stream: &mut TokenStream) -> Result<WeightInit, ParseError> {
    match stream.peek() {
        Some(Token::Normal) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let mu = expect_number(stream)?;
            stream.expect(Token::Comma)?;
            let sigma = expect_number(stream)?;
            stream.expect(Token::RParen)?;
            Ok(WeightInit::Normal { mu, sigma })
        }
        Some(Token::Uniform) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let a = expect_number(stream)?;
            stream.expect(Token::Comma)?;
            let b = expect_number(stream)?;
            stream.expect(Token::RParen)?;
            Ok(WeightInit::Uniform { a, b })
        }
        Some(Token::Constant) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let c = expect_number(stream)?;
            stream.expect(Token::RParen)?;
            Ok(WeightInit::Constant { c })
        }
        other => Err(ParseError::unexpected_token(
            other,
            "as weight init",
            stream.current_span(),
        )),
    }
}

fn parse_learning_rule(stream: &mut TokenStream) -> Result<LearningRule, ParseError> {
    match stream.peek() {
        Some(Token::Hebbian) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            expect_param(stream, "trace")?;
            let trace = expect_time(stream)?;
            stream.expect(Token::RParen)?;
            Ok(LearningRule::Hebbian { trace })
        }
        Some(Token::NoneKw) => {
            stream.advance();
            Ok(LearningRule::None)
        }
        other => Err(ParseError::unexpected_token(
            other,
            "as learning rule",
            stream.current_span(),
        )),
    }
}

// === Circuit ===

/// `circuit <Name> { actions = [...] (population|projection|modulator|plasticity)* }`
fn parse_circuit(stream: &mut TokenStream) -> Result<CircuitDecl, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Circuit)?;
    let name = expect_ident(stream)?;
    stream.expect(Token::LBrace)?;

    stream.expect(Token::Actions)?;
    stream.expect(Token::Equals)?;
    stream.expect(Token::LBracket)?;
    let actions = parse_identifier_list(stream)?;
    stream.expect(Token::RBracket)?;

    let mut populations = Vec::new();
    let mut projections = Vec::new();
    let mut modulators = Vec::new();
    let mut plasticity = Vec::new();
    loop {
        match stream.peek() {
            Some(Token::Population) => populations.push(parse_population(stream)?),
            Some(Token::Projection) => projections.push(parse_projection(stream)?),
            Some(Token::Modulator) => modulators.push(parse_modulator(stream)?),
            Some(Token::Plasticity) => plasticity.push(parse_plasticity(stream)?),
            Some(Token::RBrace) => break,
            other => {
                return Err(ParseError::unexpected_token(
                    other,
                    "in circuit body",
                    stream.current_span(),
                ));
            }
        }
    }
    stream.expect(Token::RBrace)?;

    Ok(CircuitDecl {
        name,
        actions,
        populations,
        projections,
        modulators,
        plasticity,
        span: stream.span_from(start),
    })
}

/// `plasticity <Target> { rule = <Ident> [(k=v, ...)] }`
fn parse_plasticity(stream: &mut TokenStream) -> Result<PlasticityDecl, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Plasticity)?;
    let target = expect_ident(stream)?;
    stream.expect(Token::LBrace)?;
    stream.expect(Token::Rule)?;
    stream.expect(Token::Equals)?;
    let rule = expect_ident(stream)?;

    let mut params = Vec::new();
    if stream.eat(&Token::LParen) {
        while !stream.check(&Token::RParen) {
            let key = expect_ident(stream)?;
            stream.expect(Token::Equals)?;
            let span = stream.current_span();
            let value = match stream.advance() {
                Some(Token::Time(t)) => PlasticityParam::Time(*t),
                Some(Token::Number(n)) => PlasticityParam::Number(*n),
                Some(Token::String(s)) => PlasticityParam::Text(s.clone()),
                other => {
                    return Err(ParseError::unexpected_token(
                        other,
                        "as plasticity parameter value",
                        span,
                    ));
                }
            };
            params.push((key, value));
            stream.eat(&Token::Comma);
        }
        stream.expect(Token::RParen)?;
    }
    stream.expect(Token::RBrace)?;

    Ok(PlasticityDecl {
        target,
        rule,
        params,
        span: stream.span_from(start),
    })
}

// === Modulator ===

/// `modulator <Name> { source = reward(from=Pattern, ...) }`
fn parse_modulator(stream: &mut TokenStream) -> Result<ModulatorDecl, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Modulator)?;
    let name = expect_ident(stream)?;
    stream.expect(Token::LBrace)?;
    stream.expect(Token::Source)?;
    stream.expect(Token::Equals)?;
    stream.expect(Token::Reward)?;
    stream.expect(Token::LParen)?;
    let mut patterns = Vec::new();
    while stream.check(&Token::From) {
        stream.advance();
        stream.expect(Token::Equals)?;
        patterns.push(parse_sensor_pattern(stream)?);
        stream.eat(&Token::Comma);
    }
    stream.expect(Token::RParen)?;
    stream.expect(Token::RBrace)?;

    Ok(ModulatorDecl {
        name,
        patterns,
        span: stream.span_from(start),
    })
}

// === Effector ===

/// `effector <Name> { (bind <Action> -> js("...") | noop)* }`
fn parse_effector(stream: &mut TokenStream) -> Result<EffectorDecl, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Effector)?;
    let name = expect_ident(stream)?;
    stream.expect(Token::LBrace)?;

    let mut bindings = Vec::new();
    while stream.check(&Token::Bind) {
        let bind_start = stream.current_pos();
        stream.advance();
        let action = expect_ident(stream)?;
        stream.expect(Token::Arrow)?;
        let target = match stream.peek() {
            Some(Token::Js) => {
                stream.advance();
                stream.expect(Token::LParen)?;
                let expr = expect_string(stream)?;
                stream.expect(Token::RParen)?;
                BindingTarget::Js(expr)
            }
            Some(Token::Noop) => {
                stream.advance();
                BindingTarget::Noop
            }
            other => {
                return Err(ParseError::unexpected_token(
                    other,
                    "as binding target",
                    stream.current_span(),
                ));
            }
        };
        bindings.push(BindingDecl {
            action,
            target,
            span: stream.span_from(bind_start),
        });
    }
    stream.expect(Token::RBrace)?;

    Ok(EffectorDecl {
        name,
        bindings,
        span: stream.span_from(start),
    })
}

// === Runtime ===

/// `runtime { tick = ... step { ... } [guards { ... }] }`
fn parse_runtime(stream: &mut TokenStream) -> Result<RuntimeDecl, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Runtime)?;
    stream.expect(Token::LBrace)?;

    stream.expect(Token::Tick)?;
    stream.expect(Token::Equals)?;
    let span = stream.current_span();
    let tick = match stream.advance() {
        Some(Token::Raf) => TickSpec::Frame,
        Some(Token::Time(t)) => TickSpec::Interval(*t),
        Some(Token::Ident(name)) => TickSpec::Named(name.clone()),
        other => {
            return Err(ParseError::unexpected_token(other, "as tick policy", span));
        }
    };

    stream.expect(Token::Step)?;
    stream.expect(Token::LBrace)?;
    let mut steps = Vec::new();
    while !stream.check(&Token::RBrace) {
        steps.push(parse_step(stream)?);
    }
    stream.expect(Token::RBrace)?;

    let mut guards = Vec::new();
    if stream.check(&Token::Guards) {
        stream.advance();
        stream.expect(Token::LBrace)?;
        while !stream.check(&Token::RBrace) {
            guards.push(parse_guard(stream)?);
        }
        stream.expect(Token::RBrace)?;
    }
    stream.expect(Token::RBrace)?;

    Ok(RuntimeDecl {
        tick,
        steps,
        guards,
        span: stream.span_from(start),
    })
}

/// `ingest [A, B]` | `run <qname> [dt=T] [when=Ident]` | `emit <Eff> from=<qname> [winner_only]`
fn parse_step(stream: &mut TokenStream) -> Result<Step, ParseError> {
    match stream.peek() {
        Some(Token::Ingest) => {
            stream.advance();
            stream.expect(Token::LBracket)?;
            let sensors = parse_identifier_list(stream)?;
            stream.expect(Token::RBracket)?;
            Ok(Step::Ingest { sensors })
        }
        Some(Token::Run) => {
            stream.advance();
            let module = parse_qualified_name(stream)?;
            let dt = if stream.check(&Token::Dt) {
                stream.advance();
                stream.expect(Token::Equals)?;
                Some(expect_time(stream)?)
            } else {
                None
            };
            let when = if stream.check(&Token::When) {
                stream.advance();
                stream.expect(Token::Equals)?;
                Some(expect_ident(stream)?)
            } else {
                None
            };
            Ok(Step::Run { module, dt, when })
        }
        Some(Token::Emit) => {
            stream.advance();
            let effector = expect_ident(stream)?;
            stream.expect(Token::From)?;
            stream.expect(Token::Equals)?;
            let from = parse_qualified_name(stream)?;
            let winner_only = stream.eat(&Token::WinnerOnly);
            Ok(Step::Emit {
                effector,
                from,
                winner_only,
            })
        }
        other => Err(ParseError::unexpected_token(
            other,
            "as runtime step",
            stream.current_span(),
        )),
    }
}

/// One guard declaration.
fn parse_guard(stream: &mut TokenStream) -> Result<Guard, ParseError> {
    match stream.peek() {
        Some(Token::MaxEffectsPerSec) => {
            stream.advance();
            stream.expect(Token::Equals)?;
            let limit = expect_u32(stream)?;
            Ok(Guard::MaxEffectsPerSec { limit })
        }
        Some(Token::SuppressRepeats) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            expect_param(stream, "window")?;
            let window = expect_time(stream)?;
            stream.expect(Token::RParen)?;
            Ok(Guard::SuppressRepeats { window })
        }
        Some(Token::KeepTargetRate) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let population = expect_ident(stream)?;
            stream.expect(Token::Comma)?;
            let hz = expect_number(stream)?;
            stream.expect(Token::RParen)?;
            Ok(Guard::KeepTargetRate { population, hz })
        }
        other => Err(ParseError::unexpected_token(
            other,
            "as guard",
            stream.current_span(),
        )),
    }
}

// === Shared helpers ===

/// `Ident (, Ident)*` flattened into an ordered list.
fn parse_identifier_list(stream: &mut TokenStream) -> Result<Vec<String>, ParseError> {
    let mut names = vec![expect_ident(stream)?];
    while stream.eat(&Token::Comma) {
        names.push(expect_ident(stream)?);
    }
    Ok(names)
}

/// `Ident (. Ident)*` joined back into a dotted string.
fn parse_qualified_name(stream: &mut TokenStream) -> Result<String, ParseError> {
    let mut name = expect_ident(stream)?;
    while stream.eat(&Token::Dot) {
        name.push('.');
        name.push_str(&expect_ident(stream)?);
    }
    Ok(name)
}

fn expect_ident(stream: &mut TokenStream) -> Result<String, ParseError> {
    let span = stream.current_span();
    match stream.advance() {
        Some(Token::Ident(name)) => Ok(name.clone()),
        other => Err(ParseError::unexpected_token(
            other,
            "where a name was expected",
            span,
        )),
    }
}

fn expect_number(stream: &mut TokenStream) -> Result<f64, ParseError> {
    let span = stream.current_span();
    match stream.advance() {
        Some(Token::Number(n)) => Ok(*n),
        other => Err(ParseError::unexpected_token(
            other,
            "where a number was expected",
            span,
        )),
    }
}

fn expect_u32(stream: &mut TokenStream) -> Result<u32, ParseError> {
    let span = stream.current_span();
    let n = expect_number(stream)?;
    if n.fract() != 0.0 || !(0.0..=u32::MAX as f64).contains(&n) {
        return Err(ParseError::invalid_syntax(
            format!("expected a whole number, found {n}"),
            span,
        ));
    }
    Ok(n as u32)
}

fn expect_time(stream: &mut TokenStream) -> Result<TimeValue, ParseError> {
    let span = stream.current_span();
    match stream.advance() {
        Some(Token::Time(t)) => Ok(*t),
        other => Err(ParseError::unexpected_token(
            other,
            "where a time literal was expected",
            span,
        )),
    }
}

fn expect_string(stream: &mut TokenStream) -> Result<String, ParseError> {
    let span = stream.current_span();
    match stream.advance() {
        Some(Token::String(s)) => Ok(s.clone()),
        other => Err(ParseError::unexpected_token(
            other,
            "where a string literal was expected",
            span,
        )),
    }
}

/// Expect a named `<param> =` pair where the parameter name is a plain
/// identifier (`p`, `seed`, `radius`, `temp`, `tau`, `refr`, `trace`,
/// `window`).
fn expect_param(stream: &mut TokenStream, name: &str) -> Result<(), ParseError> {
    let span = stream.current_span();
    match stream.advance() {
        Some(Token::Ident(found)) if found == name => {}
        other => {
            return Err(ParseError::unexpected_token(
                other,
                &format!("where parameter `{}` was expected", name),
                span,
            ));
        }
    }
    stream.expect(Token::Equals)
}
