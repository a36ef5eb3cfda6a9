use hostprobe_rs::ports::{load_ports_from_path, parse_port_spec, parse_ports_str};
use std::io::Write;

#[test]
fn file_keeps_port_zero_and_first_appearance_order() {
    let input = "
        3389        # rdp
        0-2         # low end of the range
        1           # already listed above
        65535
    ";
    let ports = parse_ports_str(input).expect("parse ok");
    assert_eq!(ports, vec![3389, 0, 1, 2, 65535]);
}

#[test]
fn file_lines_do_not_take_comma_lists() {
    let err = parse_ports_str("22,80\n").unwrap_err();
    assert!(err.to_string().contains("line 1"));
    assert!(err.to_string().contains("22,80"));
}

#[test]
fn port_zero_is_scannable() {
    assert_eq!(parse_port_spec("0-2").expect("parse ok"), vec![0, 1, 2]);
}

#[test]
fn out_of_range_message_names_the_value() {
    let err = parse_port_spec("65536").unwrap_err();
    assert!(err.to_string().contains("65536"));
    let err = parse_port_spec("100-5").unwrap_err();
    assert!(err.to_string().contains("100-5"));
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "22\n3389 # rdp\n130-135").expect("write");
    let ports = load_ports_from_path(file.path()).expect("load ok");
    assert_eq!(ports, vec![22, 3389, 130, 131, 132, 133, 134, 135]);
}

#[test]
fn missing_file_mentions_path() {
    let err = load_ports_from_path("/definitely/not/here.txt").unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.txt"));
}
