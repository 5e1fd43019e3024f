use nutri_config::{Config, load_file, load_labels, load_nutrition_csv};
use std::fs;
use tempfile::tempdir;

#[test]
fn loads_rows_in_file_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("foods.csv");
    fs::write(
        &path,
        "food,calories,protein,carbs,fats\nkiwi,61,1.1,15,0.5\npear, 57, 0.4, 15, 0.1\n",
    )
    .unwrap();

    let rows = load_nutrition_csv(&path).expect("load csv");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "kiwi");
    assert_eq!(rows[1].name, "pear");
    assert_eq!(rows[1].calories, 57.0);
}

#[test]
fn rejects_wrong_headers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("foods.csv");
    fs::write(&path, "name,kcal,protein,carbs,fats\nkiwi,61,1.1,15,0.5\n").unwrap();

    let err = load_nutrition_csv(&path).expect_err("headers must match");
    assert!(format!("{err}").contains("must have headers"));
}

#[test]
fn rejects_negative_macros_with_row_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("foods.csv");
    fs::write(
        &path,
        "food,calories,protein,carbs,fats\nkiwi,61,1.1,15,0.5\nbad,10,-1,0,0\n",
    )
    .unwrap();

    let err = load_nutrition_csv(&path).expect_err("negative protein");
    let msg = format!("{err}");
    assert!(msg.contains("row 3"), "{msg}");
    assert!(msg.contains("protein"), "{msg}");
}

#[test]
fn rejects_non_numeric_cells() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("foods.csv");
    fs::write(&path, "food,calories,protein,carbs,fats\nkiwi,lots,1.1,15,0.5\n").unwrap();

    let err = load_nutrition_csv(&path).expect_err("not a number");
    assert!(format!("{err}").contains("invalid CSV row 2"));
}

#[test]
fn config_csv_is_resolved_next_to_config_and_appended() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("extra.csv"),
        "food,calories,protein,carbs,fats\nkiwi,61,1.1,15,0.5\n",
    )
    .unwrap();
    let cfg_path = dir.path().join("scale.toml");
    fs::write(&cfg_path, "[nutrition]\ncsv = \"extra.csv\"\n").unwrap();

    let cfg: Config = load_file(&cfg_path).expect("load config");
    let foods = cfg.foods().expect("foods");
    assert_eq!(foods.first().map(|f| f.name.as_str()), Some("apple"));
    assert_eq!(foods.last().map(|f| f.name.as_str()), Some("kiwi"));
}

#[test]
fn labels_keep_line_indices() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("labels.txt");
    fs::write(&path, "background\ntench\n\nGranny Smith\n").unwrap();

    let labels = load_labels(&path).expect("labels");
    assert_eq!(labels.len(), 4);
    assert_eq!(labels[3], "Granny Smith");
}
