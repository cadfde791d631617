use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use nback::codec;
use nback::engine::CellSource;
use nback::prelude::*;
use nback::validator;

/// Replays a fixed list of cells, then repeats the last one.
struct Replay {
    cells: Vec<usize>,
    next: usize,
}

impl Replay {
    fn new(cells: &[usize]) -> Self {
        Self {
            cells: cells.to_vec(),
            next: 0,
        }
    }
}

impl CellSource for Replay {
    fn draw_cell(&mut self, _cells_per_box: usize) -> usize {
        let i = self.next.min(self.cells.len() - 1);
        self.next += 1;
        self.cells[i]
    }
}

fn scenario_settings() -> Settings {
    Settings {
        n: 2,
        grid_rows: 1,
        grid_cols: 1,
        grid_res: 3,
        interval_ms: 3000,
        flash_ms: 600,
        ..Settings::default()
    }
}

#[test]
fn two_back_match_on_repeated_cell() {
    let mut session = Session::with_source(scenario_settings(), Replay::new(&[5, 2, 5]));
    session.start_session(None).unwrap();
    session.next_turn().unwrap();
    session.next_turn().unwrap();

    assert_eq!(session.history().box_track(0), vec![Some(5), Some(2), Some(5)]);
    assert_eq!(
        validator::check(0, Some(2), 2, session.history()),
        Ok(true)
    );
    assert_eq!(session.respond(0), Verdict::Match { box_index: 0 });
}

#[test]
fn two_back_miss_on_different_cell() {
    let mut session = Session::with_source(scenario_settings(), Replay::new(&[5, 2, 7]));
    session.start_session(None).unwrap();
    session.next_turn().unwrap();
    session.next_turn().unwrap();

    assert_eq!(
        validator::check(0, Some(2), 2, session.history()),
        Ok(false)
    );
    assert_eq!(session.respond(0), Verdict::Miss { box_index: 0 });
    assert_eq!(session.stats().incorrect, 1);
}

#[test]
fn every_query_before_n_is_refused_for_every_box() {
    let settings = Settings::default().with_n(3).with_grid(2, 2, 3);
    let mut session = Session::with_seed(settings, 21);
    session.start_session(None).unwrap();
    for _ in 0..3 {
        for b in 0..4 {
            assert!(session.respond(b).is_refused());
        }
        session.next_turn().unwrap();
    }
    for b in 0..4 {
        assert!(!session.respond(b).is_refused());
    }
}

#[test]
fn single_cell_boxes_always_match() {
    let settings = Settings::default().with_grid(2, 2, 1);
    let mut session = Session::with_seed(settings, 8);
    session.start_session(None).unwrap();
    for _ in 0..6 {
        session.next_turn().unwrap();
        for b in 0..4 {
            assert!(session.respond(b).is_match());
        }
    }
    assert!(session.history().iter().all(|f| f.cells == vec![0; 4]));
}

#[test]
fn start_makes_history_non_empty_immediately() {
    let mut session = Session::default();
    assert!(session.history().is_empty());
    assert_eq!(session.step_count(), 0);

    session.start_session(None).unwrap();
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.step_count(), 1);
}

#[test]
fn check_matches_history_exactly_for_random_sessions() {
    let settings = Settings::default().with_n(2).with_grid(2, 3, 2);
    let mut session = Session::with_seed(settings, 1234);
    session.start_session(None).unwrap();
    for _ in 0..200 {
        session.next_turn().unwrap();
    }

    let history = session.history();
    for t in 2..=200u64 {
        for b in 0..6 {
            let expected = history.cell(t, b) == history.cell(t - 2, b);
            assert_eq!(validator::check(b, Some(t), 2, history), Ok(expected));
        }
    }
}

#[test]
fn token_round_trip_and_bad_lag_rejected() {
    let settings = Settings::default()
        .with_n(3)
        .with_grid(2, 2, 4)
        .with_timing(2000, 400);
    let token = codec::encode(&settings).unwrap();
    assert!(token.is_ascii());
    assert_eq!(codec::decode(&token), Ok(settings));

    // {"n":0}
    let mut session = Session::with_seed(settings, 1);
    let err = session.import_settings("eyJuIjowfQ==").unwrap_err();
    assert_eq!(err.to_string(), "invalid save data");
    assert_eq!(session.settings(), &settings);
}

#[test]
fn oversized_grid_token_leaves_running_session_alone() {
    let mut session = Session::with_seed(Settings::default(), 3);
    session.start_session(None).unwrap();
    session.next_turn().unwrap();

    let token =
        STANDARD.encode(r#"{"gridRows":4294967295,"gridCols":4294967295,"gridRes":1}"#);
    let err = session.import_settings(&token).unwrap_err();
    assert_eq!(err.to_string(), "invalid save data");

    let huge = Settings::default().with_grid(65_536, 65_536, 1);
    assert!(session.start_session(Some(huge)).is_err());

    assert_eq!(session.settings(), &Settings::default());
    assert!(session.is_running());
    assert_eq!(session.current_turn(), Some(1));
    assert_eq!(session.history().len(), 2);
}

#[test]
fn sessions_are_independent() {
    let mut a = Session::with_seed(Settings::default(), 1);
    let mut b = Session::with_seed(Settings::default().with_grid(1, 2, 2), 1);
    a.start_session(None).unwrap();
    b.start_session(None).unwrap();
    b.next_turn().unwrap();
    assert_eq!(a.history().len(), 1);
    assert_eq!(b.history().len(), 2);
    assert_eq!(b.history().last().unwrap().box_count(), 2);
}
