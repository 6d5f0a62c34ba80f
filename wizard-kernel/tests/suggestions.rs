mod common;

use std::sync::Arc;

use common::{ScriptedTransport, chat_reply, engine, field, gateway_with_key, openai_gateway};
use wizard_adapters::{AdapterError, TransportResponse};
use wizard_kernel::{GenerateOutcome, StepSequencer, TaskScheduler, Transition};
use wizard_primitives::SelectionPolicy;
use wizard_prompts::{SuggestionBrief, SuggestionContext, builtin_steps};

#[tokio::test]
async fn numbered_reply_replaces_the_list() {
    let transport =
        Arc::new(ScriptedTransport::new().reply(chat_reply("1. Idea one\n2. Idea two\n\n3. Idea three")));
    let engine = engine(openai_gateway(Arc::clone(&transport)));
    let goal = field("goal");

    let outcome = engine
        .generate(&goal, &SuggestionContext::new().with_entry("Current idea", "Bakery"))
        .await
        .unwrap();

    assert_eq!(outcome, GenerateOutcome::Generated { count: 3 });
    let items = engine.items(&goal);
    let texts: Vec<&str> = items.iter().map(|item| item.text()).collect();
    assert_eq!(texts, ["Idea one", "Idea two", "Idea three"]);
    assert!(items.iter().all(|item| !item.is_selected()));
    assert!(!engine.is_in_progress(&goal));

    let requests = transport.requests();
    let prompt = requests[0].body()["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.starts_with("Based on:\n1. Current idea: \"Bakery\"\n"));
    assert!(prompt.contains("Suggest exactly 5"));
}

#[tokio::test(start_paused = true)]
async fn three_failures_fall_back_to_defaults() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail(AdapterError::transport("connection reset"))
            .reply(TransportResponse::new(500, "upstream down"))
            .reply(chat_reply("\n   \n")),
    );
    let engine = engine(openai_gateway(Arc::clone(&transport)));
    let audience = field("audience");

    let outcome = engine.generate(&audience, &SuggestionContext::new()).await.unwrap();

    assert!(matches!(outcome, GenerateOutcome::Fallback { .. }));
    assert_eq!(transport.calls(), 3);
    assert!(!engine.is_in_progress(&audience));
    let texts: Vec<String> = engine
        .items(&audience)
        .iter()
        .map(|item| item.text().to_owned())
        .collect();
    assert_eq!(texts, SuggestionBrief::for_field("audience").defaults());
}

#[tokio::test]
async fn configuration_errors_are_not_retried() {
    let transport = Arc::new(ScriptedTransport::new().fail(AdapterError::configuration("bad endpoint")));
    let engine = engine(openai_gateway(Arc::clone(&transport)));

    let outcome = engine.generate(&field("design"), &SuggestionContext::new()).await.unwrap();

    assert!(matches!(outcome, GenerateOutcome::Fallback { .. }));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn second_generate_while_in_flight_is_a_no_op() {
    let (transport, release) = ScriptedTransport::held();
    let transport = Arc::new(transport.reply(chat_reply("1. First\n2. Second")));
    let engine = engine(openai_gateway(Arc::clone(&transport)));
    let goal = field("goal");

    let first = tokio::spawn({
        let engine = engine.clone();
        let goal = goal.clone();
        async move { engine.generate(&goal, &SuggestionContext::new()).await }
    });
    while transport.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(engine.is_in_progress(&goal));

    let second = engine.generate(&goal, &SuggestionContext::new()).await.unwrap();
    assert_eq!(second, GenerateOutcome::Skipped);
    assert_eq!(transport.calls(), 1);
    assert!(engine.items(&goal).is_empty());
    assert!(engine.is_in_progress(&goal));

    release.notify_one();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first, GenerateOutcome::Generated { count: 2 });
    assert!(!engine.is_in_progress(&goal));
}

#[tokio::test]
async fn invalidated_result_is_discarded() {
    let (transport, release) = ScriptedTransport::held();
    let transport = Arc::new(transport.reply(chat_reply("1. Late idea")));
    let engine = engine(openai_gateway(Arc::clone(&transport)));
    let goal = field("goal");

    let pending = tokio::spawn({
        let engine = engine.clone();
        let goal = goal.clone();
        async move { engine.generate(&goal, &SuggestionContext::new()).await }
    });
    while transport.calls() == 0 {
        tokio::task::yield_now().await;
    }

    engine.invalidate(&goal);
    release.notify_one();

    assert_eq!(pending.await.unwrap().unwrap(), GenerateOutcome::Stale);
    assert!(!engine.has_suggestions(&goal));
    assert!(!engine.is_in_progress(&goal));
}

#[tokio::test]
async fn returning_to_a_field_keeps_its_running_prefetch() {
    let (transport, release) = ScriptedTransport::held();
    let transport = Arc::new(transport.reply(chat_reply("1. Families\n2. Students")));
    let engine = engine(openai_gateway(Arc::clone(&transport)));
    let mut wizard =
        StepSequencer::new(builtin_steps().unwrap(), engine.clone(), TaskScheduler::default()).unwrap();
    let audience = field("audience");

    wizard.set_field_value(&field("goal"), "Bakery website").unwrap();
    let Transition::Moved {
        prefetch: Some(first),
        ..
    } = wizard.advance().unwrap()
    else {
        panic!("audience prefetch did not start");
    };
    while transport.calls() == 0 {
        tokio::task::yield_now().await;
    }

    assert!(wizard.retreat());
    let Transition::Moved { position, prefetch } = wizard.advance().unwrap() else {
        panic!("expected a move");
    };
    assert_eq!(position, 1);
    assert!(prefetch.is_none());
    assert!(engine.is_in_progress(&audience));

    release.notify_one();
    assert_eq!(first.join().await.unwrap(), GenerateOutcome::Generated { count: 2 });
    assert_eq!(wizard.position(), 1);
    assert_eq!(engine.items(&audience).len(), 2);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn missing_credential_needs_setup() {
    let transport = Arc::new(ScriptedTransport::new());
    let engine = engine(gateway_with_key(Arc::clone(&transport), "openrouter", None));
    let goal = field("goal");

    let outcome = engine.generate(&goal, &SuggestionContext::new()).await.unwrap();

    assert_eq!(
        outcome,
        GenerateOutcome::CredentialRequired {
            provider: "openrouter".into()
        }
    );
    assert_eq!(transport.calls(), 0);
    assert!(!engine.is_in_progress(&goal));
    assert!(!engine.has_suggestions(&goal));
}

#[tokio::test]
async fn select_then_unselect_restores_the_value() {
    let transport = Arc::new(ScriptedTransport::new().reply(chat_reply("1. Idea one\n2. Idea two")));
    let engine = engine(openai_gateway(transport));
    let requirements = field("requirements");
    engine
        .generate(&requirements, &SuggestionContext::new())
        .await
        .unwrap();

    let original = "Checkout\nBlog";
    let selected = engine
        .toggle(&requirements, 1, original, SelectionPolicy::Independent)
        .unwrap();
    assert_eq!(selected, "Checkout\nBlog\nIdea two");
    assert!(engine.items(&requirements)[1].is_selected());

    let restored = engine
        .toggle(&requirements, 1, &selected, SelectionPolicy::Independent)
        .unwrap();
    assert_eq!(restored, original);
    assert!(!engine.items(&requirements)[1].is_selected());
}

#[tokio::test]
async fn unselect_removes_only_that_line() {
    let transport = Arc::new(ScriptedTransport::new().reply(chat_reply("1. Idea one\n2. Idea two")));
    let engine = engine(openai_gateway(transport));
    let design = field("design");
    engine.generate(&design, &SuggestionContext::new()).await.unwrap();

    let value = engine.toggle(&design, 0, "", SelectionPolicy::Independent).unwrap();
    assert_eq!(value, "Idea one");
    let value = engine.toggle(&design, 1, &value, SelectionPolicy::Independent).unwrap();
    assert_eq!(value, "Idea one\nIdea two");

    let value = engine.toggle(&design, 0, &value, SelectionPolicy::Independent).unwrap();
    assert_eq!(value, "Idea two");
}

#[tokio::test]
async fn exclusive_policy_keeps_one_selection() {
    let transport = Arc::new(ScriptedTransport::new().reply(chat_reply("1. Shop\n2. Blog\n3. Portfolio")));
    let engine = engine(openai_gateway(transport));
    let goal = field("goal");
    engine.generate(&goal, &SuggestionContext::new()).await.unwrap();

    let value = engine.toggle(&goal, 0, "", SelectionPolicy::Exclusive).unwrap();
    let value = engine.toggle(&goal, 2, &value, SelectionPolicy::Exclusive).unwrap();

    assert_eq!(value, "Portfolio");
    let selected: Vec<bool> = engine.items(&goal).iter().map(|item| item.is_selected()).collect();
    assert_eq!(selected, [false, false, true]);
}

#[tokio::test]
async fn toggle_out_of_range_is_an_error() {
    let engine = engine(openai_gateway(Arc::new(ScriptedTransport::new())));
    assert!(
        engine
            .toggle(&field("goal"), 0, "", SelectionPolicy::Independent)
            .is_err()
    );
}
