use lazy_disclosure::{DisclosureConfig, FetchResponse, Page};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};

const DISCLOSURE_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/disclosure_property_fuzz_test.txt";
const DEFAULT_DISCLOSURE_PROPTEST_CASES: u32 = 128;

const PAIRS: [&str; 2] = ["alpha", "beta"];

const REPORT_HTML: &str = r#"
<section id="report">
  <p>
    <a id="alpha-showlink" data-query="/alpha?rev=0">show alpha</a>
    <a id="alpha-hidelink" style="display: none">hide alpha</a>
  </p>
  <div id="alpha" style="display: none"></div>
  <p>
    <a id="beta-showlink" data-query="/beta?rev=0">show beta</a>
    <a id="beta-hidelink" style="display: none">hide beta</a>
  </p>
  <div id="beta" style="display: none"></div>
</section>
"#;

#[derive(Clone, Debug)]
enum PageAction {
    Show(usize),
    Hide(usize),
    Retarget(usize, u8),
    RespondOldest(String),
    RespondNewest(String),
    Flush,
}

fn disclosure_proptest_cases() -> u32 {
    std::env::var("LAZY_DISCLOSURE_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_DISCLOSURE_PROPTEST_CASES)
}

fn body_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just(String::new()),
        Just("<p>ok</p>".to_string()),
        Just("plain text".to_string()),
        Just("<ul><li>a<li>b</ul>".to_string()),
        Just("<h1>500 Internal Server Error</h1>".to_string()),
    ]
    .boxed()
}

fn action_strategy() -> BoxedStrategy<PageAction> {
    let pair = 0..PAIRS.len();
    prop_oneof![
        4 => pair.clone().prop_map(PageAction::Show),
        3 => pair.clone().prop_map(PageAction::Hide),
        1 => (pair, any::<u8>()).prop_map(|(index, rev)| PageAction::Retarget(index, rev)),
        2 => body_strategy().prop_map(PageAction::RespondOldest),
        2 => body_strategy().prop_map(PageAction::RespondNewest),
        1 => Just(PageAction::Flush),
    ]
    .boxed()
}

fn action_sequence_strategy() -> BoxedStrategy<Vec<PageAction>> {
    vec(action_strategy(), 1..=32).boxed()
}

fn fail(message: String) -> TestCaseError {
    TestCaseError::fail(message)
}

fn run_action(page: &mut Page, action: &PageAction) -> lazy_disclosure::Result<()> {
    match action {
        PageAction::Show(index) => page.click(&format!("#{}-showlink", PAIRS[*index])),
        PageAction::Hide(index) => page.click(&format!("#{}-hidelink", PAIRS[*index])),
        PageAction::Retarget(index, rev) => {
            let id = format!("{}-showlink", PAIRS[*index]);
            let Some(control) = page.element_by_id(&id) else {
                return Ok(());
            };
            page.set_attribute(control, "data-query", &format!("/{}?rev={rev}", PAIRS[*index]))
        }
        PageAction::RespondOldest(body) => {
            if let Some(request) = page.pending_fetches().first() {
                page.complete_fetch(request.id, FetchResponse::ok(body))?;
            }
            Ok(())
        }
        PageAction::RespondNewest(body) => {
            if let Some(request) = page.pending_fetches().last() {
                page.complete_fetch(request.id, FetchResponse::ok(body))?;
            }
            Ok(())
        }
        PageAction::Flush => page.flush(),
    }
}

fn assert_disclosure_sequence_is_consistent(
    config: DisclosureConfig,
    actions: &[PageAction],
) -> TestCaseResult {
    let mut page = Page::from_html_with_config(REPORT_HTML, config)
        .map_err(|err| fail(format!("{err:?}")))?;
    page.set_fetch_mock("/alpha?rev=0", "<em>alpha</em>");

    for (step, action) in actions.iter().enumerate() {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_action(&mut page, action)
        }));

        match outcome {
            Err(_) => {
                prop_assert!(
                    false,
                    "action panicked at step {step}: {action:?}, actions={actions:?}"
                );
            }
            Ok(Err(error)) => {
                prop_assert!(
                    false,
                    "action returned error at step {step}: {action:?}, error={error:?}, actions={actions:?}"
                );
            }
            Ok(Ok(())) => {}
        }

        for base_id in PAIRS {
            let state = page
                .disclosure_state(base_id)
                .map_err(|err| fail(format!("{base_id} lost at step {step}: {err:?}")))?;
            prop_assert!(
                state.is_consistent(),
                "{base_id} out of lockstep after step {step}: {action:?}, state={state:?}, actions={actions:?}"
            );
        }
    }

    let issued_per_region = PAIRS.map(|base_id| {
        actions
            .iter()
            .filter(|action| matches!(action, PageAction::Show(index) if PAIRS[*index] == base_id))
            .count()
    });
    let calls = page.take_fetch_calls();
    prop_assert_eq!(calls.len(), issued_per_region.iter().sum::<usize>());

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: disclosure_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(DISCLOSURE_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn disclosure_pairs_stay_in_lockstep(actions in action_sequence_strategy()) {
        assert_disclosure_sequence_is_consistent(DisclosureConfig::default(), &actions)?;
    }

    #[test]
    fn legacy_disclosure_pairs_stay_in_lockstep(actions in action_sequence_strategy()) {
        assert_disclosure_sequence_is_consistent(DisclosureConfig::legacy(), &actions)?;
    }
}
