mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, seed, spawn_sidecar, temp_dir, BASE_SEED};

#[test]
fn holds_add_query_and_delete_keep_severity_current() {
    let workspace = temp_dir("stuadmd-holds");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed(&workspace, BASE_SEED);
    seed(
        &workspace,
        "INSERT INTO student(stu_id, last_name, first_name) VALUES('222', 'Roe', 'Jan');
         INSERT INTO admin_hold(stu_id, hold_id, sev_admin_hold, times_display, create_dt)
             VALUES('222', '30', 'N', 2, '2026-09-01');",
    );

    let types = request_ok(&mut stdin, &mut reader, "2", "holds.types", json!({}));
    assert_eq!(types["types"].as_array().map(Vec::len), Some(10));

    request_ok(&mut stdin, &mut reader, "3", "students.select", json!({ "stuId": "111" }));
    let added = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "holds.add",
        json!({ "holdId": "06", "asOf": "2026-10-19" }),
    );
    assert_eq!(added["hold"]["sevAdminHold"], "F");
    assert_eq!(added["hold"]["createDt"], "2026-10-19");
    assert_eq!(added["hold"]["timesDisplay"], json!(0));

    let (code, message) = request_err(&mut stdin, &mut reader, "5", "holds.add", json!({ "holdId": "06" }));
    assert_eq!(code, "validation_failed");
    assert_eq!(message, "Student already has hold 06.");
    let (code, _) = request_err(&mut stdin, &mut reader, "6", "holds.add", json!({ "holdId": "6" }));
    assert_eq!(code, "validation_failed");

    let listed = request_ok(&mut stdin, &mut reader, "7", "holds.list", json!({}));
    let holds = listed["holds"].as_array().expect("holds");
    assert_eq!(holds.len(), 1);
    assert_eq!(holds[0]["holdId"], "06");
    assert_eq!(holds[0]["cannotTest"], json!(true));
    assert_eq!(
        holds[0]["staffMessage"],
        "Academic misconduct under review; testing suspended."
    );

    let selected = request_ok(&mut stdin, &mut reader, "8", "students.select", json!({ "stuId": "111" }));
    assert_eq!(selected["student"]["sevAdminHold"], "F");

    let by_hold = request_ok(&mut stdin, &mut reader, "9", "holds.query", json!({ "holdId": "30" }));
    let found = by_hold["holds"].as_array().expect("query holds");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["stuId"], "222");
    assert_eq!(found[0]["cannotTest"], json!(false));

    let fatal = request_ok(&mut stdin, &mut reader, "10", "holds.query", json!({ "severity": "f" }));
    assert_eq!(fatal["holds"][0]["stuId"], "111");
    let (code, _) = request_err(&mut stdin, &mut reader, "11", "holds.query", json!({ "timesDisplay": "abc" }));
    assert_eq!(code, "validation_failed");

    request_ok(&mut stdin, &mut reader, "12", "holds.delete", json!({ "holdId": "06" }));
    let (code, _) = request_err(&mut stdin, &mut reader, "13", "holds.delete", json!({ "holdId": "06" }));
    assert_eq!(code, "not_found");
    let listed = request_ok(&mut stdin, &mut reader, "14", "holds.list", json!({}));
    assert_eq!(listed["holds"], json!([]));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn discipline_incidents_are_validated_and_labelled() {
    let workspace = temp_dir("stuadmd-discipline");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed(&workspace, BASE_SEED);
    request_ok(&mut stdin, &mut reader, "2", "students.select", json!({ "stuId": "111" }));

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "discipline.add",
        json!({ "incidentType": "RB" }),
    );
    assert_eq!(code, "validation_failed");
    assert_eq!(message, "Incident date must be set.");

    let (_, message) = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "discipline.add",
        json!({ "incidentDate": "10/02/2026", "incidentType": "CH" }),
    );
    assert_eq!(message, "A description is required for cheating incidents.");

    let added = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "discipline.add",
        json!({
            "incidentDate": "10/02/2026",
            "incidentType": "ch",
            "course": "M 117",
            "unit": 3,
            "description": "Notes under the desk",
            "actionType": "RC",
            "proctor": "Lopez"
        }),
    );
    let id = added["incident"]["id"].as_str().expect("incident id").to_string();
    assert_eq!(added["incident"]["dtIncident"], "2026-10-02");
    assert_eq!(added["incident"]["unit"], json!(3));

    let listed = request_ok(&mut stdin, &mut reader, "6", "discipline.list", json!({}));
    let incidents = listed["incidents"].as_array().expect("incidents");
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0]["incidentLabel"], "Cheating");
    assert_eq!(incidents[0]["actionLabel"], "Referred to conduct office");
    assert_eq!(incidents[0]["cheatDesc"], "Notes under the desk");

    request_ok(&mut stdin, &mut reader, "7", "discipline.delete", json!({ "id": id }));
    let (code, _) = request_err(&mut stdin, &mut reader, "8", "discipline.delete", json!({ "id": id }));
    assert_eq!(code, "not_found");
    let listed = request_ok(&mut stdin, &mut reader, "9", "discipline.list", json!({}));
    assert_eq!(listed["incidents"], json!([]));

    drop(stdin);
    let _ = child.wait();
}
