use std::{fs, path::PathBuf, process::Command};

use room_crawler_session::SaveRecord;

fn save_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("room-crawler-{name}-{}.save", std::process::id()));
    let _ = fs::remove_file(&path);
    path
}

fn play(save: &PathBuf) {
    let status = Command::new(env!("CARGO_BIN_EXE_room-crawler"))
        .args(["--levels", "1", "--frame-ms", "20", "--save"])
        .arg(save)
        .env("RUST_LOG", "warn")
        .status()
        .expect("failed to launch room-crawler binary");

    assert!(status.success(), "room-crawler should finish the scripted run");
}

fn stored_record(save: &PathBuf) -> SaveRecord {
    let line = fs::read_to_string(save).expect("session record written");
    SaveRecord::decode(&line).expect("session record decodes")
}

#[test]
fn scripted_run_persists_next_level() {
    let save = save_path("next-level");
    play(&save);

    let record = stored_record(&save);
    assert_eq!((record.world_index, record.level_index), (0, 1));
    assert!(record.last_completed_level_coin_balance >= 100);

    let _ = fs::remove_file(&save);
}

#[test]
fn second_run_resumes_from_saved_level() {
    let save = save_path("resume");
    play(&save);
    play(&save);

    let record = stored_record(&save);
    assert_eq!((record.world_index, record.level_index), (0, 1));
    assert!(record.last_completed_level_coin_balance >= 60);
    assert!(record.last_completed_level_coin_balance < 100);

    let _ = fs::remove_file(&save);
}
