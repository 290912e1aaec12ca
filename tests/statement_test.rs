mod common;
use basic::mach::Status;
use common::*;

#[test]
fn test_for_loop_runs_body_in_order() {
    let mut r = basic();
    program(
        &mut r,
        &["10 FOR I=1 TO 3", "20 PRINT I", "30 NEXT I", r#"40 PRINT "DONE""#],
    );
    assert_eq!(exec(&mut r, "RUN"), "1\n2\n3\nDONE\nOK\n");
}

#[test]
fn test_for_loop_negative_step() {
    let mut r = basic();
    program(&mut r, &["10 for i=3 to 1 step -1", "20 print i", "30 next i"]);
    assert_eq!(exec(&mut r, "run"), "3\n2\n1\nOK\n");
}

#[test]
fn test_nested_for_loops() {
    let mut r = basic();
    program(
        &mut r,
        &[
            "10 FOR I=1 TO 2",
            "20 FOR J=1 TO 2",
            "30 PRINT I*10+J",
            "40 NEXT J",
            "50 NEXT I",
        ],
    );
    assert_eq!(exec(&mut r, "RUN"), "11\n12\n21\n22\nOK\n");
}

#[test]
fn test_for_loop_zero_step_runs_once() {
    let mut r = basic();
    program(&mut r, &["10 FOR I=1 TO 3 STEP 0", "20 NEXT I", "30 PRINT 9"]);
    r.host_mut().break_after = Some(1000);
    assert_eq!(exec(&mut r, "RUN"), "9\nOK\n");
}

#[test]
fn test_next_drops_gosub_frames() {
    let mut r = basic();
    program(
        &mut r,
        &["10 FOR I=1 TO 2", "20 GOSUB 100", "100 PRINT I", "110 NEXT I"],
    );
    assert_eq!(exec(&mut r, "RUN"), "1\n2\nOK\n");
    assert_eq!(exec(&mut r, "RETURN"), "OK\n");
}

#[test]
fn test_gosub_resumes_after_call() {
    let mut r = basic();
    program(
        &mut r,
        &[
            "10 GOSUB 100",
            r#"20 PRINT "BACK""#,
            "30 GOTO 999",
            r#"100 PRINT "SUB""#,
            "110 RETURN",
        ],
    );
    assert_eq!(exec(&mut r, "RUN"), "SUB\nBACK\nOK\n");
}

#[test]
fn test_return_into_for_frame_is_fatal() {
    let mut r = basic();
    program(
        &mut r,
        &["10 GOSUB 100", "20 GOTO 999", "100 FOR I=1 TO 2", "110 RETURN"],
    );
    assert_eq!(r.enter("RUN"), Status::OutOfMemory);
    assert_eq!(
        r.host_mut().take_output(),
        "Out of memory; STACK\n>> 110 RETURN\n"
    );
}

fn branches(a: i32) -> String {
    let mut r = basic();
    let first = format!("10 A={}", a);
    program(
        &mut r,
        &[
            first.as_str(),
            "20 IF A=1",
            r#"30 PRINT "ONE""#,
            "40 ELIF A=2",
            r#"50 PRINT "TWO""#,
            "60 ELSE",
            r#"70 PRINT "OTHER""#,
            "80 END",
            r#"90 PRINT "AFTER""#,
        ],
    );
    exec(&mut r, "RUN")
}

#[test]
fn test_if_elif_else() {
    assert_eq!(branches(1), "ONE\nAFTER\nOK\n");
    assert_eq!(branches(2), "TWO\nAFTER\nOK\n");
    assert_eq!(branches(3), "OTHER\nAFTER\nOK\n");
}

#[test]
fn test_nested_if_is_skipped_whole() {
    let mut r = basic();
    program(
        &mut r,
        &[
            "10 IF 0",
            "20 IF 1",
            r#"30 PRINT "INNER""#,
            "40 ELSE",
            r#"50 PRINT "INNER ELSE""#,
            "60 END",
            "70 ELSE",
            r#"80 PRINT "OUTER ELSE""#,
            "90 END",
        ],
    );
    assert_eq!(exec(&mut r, "RUN"), "OUTER ELSE\nOK\n");
}

#[test]
fn test_program_only_statements() {
    let mut r = basic();
    assert_eq!(exec(&mut r, "IF 1"), "Not in direct\n");
    assert_eq!(exec(&mut r, "ELSE"), "Not in direct\n");
    assert_eq!(exec(&mut r, "DELAY 10"), "Not in direct\n");
}

#[test]
fn test_print() {
    let mut r = basic();
    assert_eq!(exec(&mut r, "PRINT 2+3*4"), "14\nOK\n");
    assert_eq!(exec(&mut r, r#"print "a", 1, 'b'"#), "a1b\nOK\n");
    assert_eq!(exec(&mut r, r#"PRINT "OPEN"#), "Error\n");
}

#[test]
fn test_error_names_stored_line() {
    let mut r = basic();
    program(&mut r, &["10 PRINT 1/0"]);
    assert_eq!(exec(&mut r, "RUN"), "Divide by zero\n>> 10 PRINT 1/0\n");
    assert_eq!(exec(&mut r, "PRINT 1+"), "Bad expression\n");
    assert_eq!(exec(&mut r, "FROB"), "Error\n");
}

#[test]
fn test_let_and_dim() {
    let mut r = basic();
    assert_eq!(exec(&mut r, "LET B=7"), "OK\n");
    assert_eq!(exec(&mut r, "DIM A(3)"), "OK\n");
    assert_eq!(exec(&mut r, "A(1)=200+B"), "OK\n");
    assert_eq!(exec(&mut r, r#"PRINT A(1), " ", LEN(A)"#), "207 3\nOK\n");
    assert_eq!(exec(&mut r, "A(3)=1"), "Bad expression\n");
    assert_eq!(exec(&mut r, "A=1"), "Error\n");
    assert_eq!(r.enter("DIM C(5000)"), Status::OutOfMemory);
    assert_eq!(r.host_mut().take_output(), "Out of memory\n");
}

#[test]
fn test_array_element_keeps_low_byte() {
    let mut r = basic();
    exec(&mut r, "DIM A(1)");
    assert_eq!(exec(&mut r, "A(0)=258"), "OK\n");
    assert_eq!(exec(&mut r, "PRINT A(0)"), "2\nOK\n");
}

#[test]
fn test_next_without_for() {
    let mut r = basic();
    assert_eq!(exec(&mut r, "NEXT I"), "Error\n");
}

#[test]
fn test_run_clears_variables() {
    let mut r = basic();
    program(&mut r, &["10 PRINT A"]);
    exec(&mut r, "A=5");
    assert_eq!(exec(&mut r, "RUN"), "0\nOK\n");
}

#[test]
fn test_break_stops_program() {
    let mut r = basic();
    program(&mut r, &["10 A=A+1", "20 GOTO 10"]);
    r.host_mut().break_after = Some(3);
    assert_eq!(exec(&mut r, "RUN"), "Break\n>> 10 A=A+1\n");
    assert_eq!(exec(&mut r, "PRINT A"), "1\nOK\n");
}

#[test]
fn test_list_indents_blocks() {
    let mut r = basic();
    program(
        &mut r,
        &[
            "10 if a",
            "20 print 1",
            "30 else",
            "40 for i=1 to 2",
            "50 next i",
            "60 end",
            "100 rem hi",
        ],
    );
    assert_eq!(
        exec(&mut r, "LIST"),
        concat!(
            "   10 IF A\n",
            "   20   PRINT 1\n",
            "   30 ELSE\n",
            "   40   FOR I=1 TO 2\n",
            "   50   NEXT I\n",
            "   60 END\n",
            "  100 REM HI\n",
            "OK\n",
        )
    );
    assert_eq!(
        exec(&mut r, "LIST 50"),
        "   50   NEXT I\n   60 END\n  100 REM HI\nOK\n"
    );
}

#[test]
fn test_new_and_mem() {
    let mut r = basic();
    assert_eq!(
        exec(&mut r, "MEM"),
        "3988 bytes free.\n8176 bytes of flash free.\nOK\n"
    );
    program(&mut r, &["10 PRINT 1"]);
    assert!(exec(&mut r, "MEM").starts_with("3986 bytes free.\n"));
    assert_eq!(exec(&mut r, "NEW"), "OK\n");
    assert!(r.store().is_empty());
    assert_eq!(exec(&mut r, "RUN"), "OK\n");
}

#[test]
fn test_pins() {
    let mut r = with_host(
        basic::mach::Config::default(),
        basic::mach::Recorder::new().with_pin(0, 3),
    );
    assert_eq!(exec(&mut r, "P0(3)=HIGH"), "OK\n");
    assert_eq!(r.host().pins[&(0, 3)], true);
    assert_eq!(exec(&mut r, "PRINT P0(3)"), "1\nOK\n");
    assert_eq!(exec(&mut r, "P0(9)=1"), "Bad pin\n");
    assert_eq!(exec(&mut r, "P1(0)=1"), "Bad pin\n");
}

#[test]
fn test_reboot_terminates() {
    let mut r = basic();
    assert_eq!(r.enter("REBOOT"), Status::Terminate);
    assert!(r.host().rebooted);
    assert_eq!(r.host_mut().take_output(), "");
}
