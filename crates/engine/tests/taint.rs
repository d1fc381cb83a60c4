use engine::{analyze_ir, default_rules};
use ir::ProgramIR;
use parsers::go;

fn lower(src: &str) -> ProgramIR {
    go::lower_source(src).expect("fixture lowers cleanly")
}

const SSRF_HANDLER: &str = "package main\n\
\n\
func handler(w http.ResponseWriter, r *http.Request) {\n\
\turls, _ := r.URL.Query()[\"url\"]\n\
\tif len(urls) > 0 {\n\
\t\ttarget := urls[0]\n\
\t\thttp.Get(target)\n\
\t}\n\
}\n";

#[test]
fn ssrf_on_query_parameter() {
    let prog = lower(SSRF_HANDLER);
    let vulns = analyze_ir(&prog, "handler.go", &default_rules());

    assert_eq!(vulns.len(), 1, "{vulns:#?}");
    let v = &vulns[0];
    assert!(v.kind.contains("SSRF"));
    assert_eq!(v.severity, "HIGH");
    assert_eq!(v.file, "handler.go");
    assert_eq!(v.line, 4, "source line is the query access");
    assert_eq!(v.sink.line, 7, "sink line is the http.Get call");
    assert!(v.path.len() >= 2);
    assert_eq!(v.path.first(), Some(&v.source));
    assert_eq!(v.path.last(), Some(&v.sink));
}

#[test]
fn path_traversal_reports_once_per_source() {
    // Two sinks fed by one tainted variable; BFS visiting guarantees a
    // single finding for the single source instruction.
    let prog = lower(
        "package main\n\
         \n\
         func handler(w http.ResponseWriter, r *http.Request) {\n\
         \tfiles, _ := r.URL.Query()[\"file\"]\n\
         \tif len(files) > 0 {\n\
         \t\tfilename := files[0]\n\
         \t\tos.Open(filename)\n\
         \t\tioutil.ReadFile(filename)\n\
         \t}\n\
         }\n",
    );
    let vulns = analyze_ir(&prog, "handler.go", &default_rules());

    let traversal: Vec<_> = vulns
        .iter()
        .filter(|v| v.kind.contains("Path Traversal"))
        .collect();
    assert_eq!(traversal.len(), 1, "{vulns:#?}");
    assert_eq!(traversal[0].severity, "HIGH");
    let sink = &traversal[0].sink.code;
    assert!(
        sink.contains("os.Open") || sink.contains("ioutil.ReadFile"),
        "{sink}"
    );
}

#[test]
fn xss_through_byte_conversion_and_fprintf() {
    let prog = lower(
        "package main\n\
         \n\
         func handler(w http.ResponseWriter, r *http.Request) {\n\
         \tinputs, _ := r.URL.Query()[\"input\"]\n\
         \tif len(inputs) > 0 {\n\
         \t\tuserInput := inputs[0]\n\
         \t\tw.Write([]byte(userInput))\n\
         \t\tfmt.Fprintf(w, \"Hello %s\", userInput)\n\
         \t}\n\
         }\n",
    );
    let vulns = analyze_ir(&prog, "handler.go", &default_rules());

    let xss: Vec<_> = vulns.iter().filter(|v| v.kind.contains("XSS")).collect();
    assert!(!xss.is_empty(), "{vulns:#?}");
    assert!(xss.iter().all(|v| v.severity == "MEDIUM"));
}

#[test]
fn taint_without_reachable_sink_is_silent() {
    let prog = lower(
        "package main\n\
         \n\
         func f(r *http.Request) {\n\
         \tvals, _ := r.URL.Query()[\"x\"]\n\
         \ta := vals\n\
         \tb := a\n\
         \tc := a + b\n\
         \t_ = c\n\
         }\n",
    );
    let vulns = analyze_ir(&prog, "f.go", &default_rules());
    assert!(vulns.is_empty(), "{vulns:#?}");
}

#[test]
fn analysis_is_deterministic() {
    let prog = lower(SSRF_HANDLER);
    let rules = default_rules();
    let first = analyze_ir(&prog, "handler.go", &rules);
    for _ in 0..5 {
        assert_eq!(analyze_ir(&prog, "handler.go", &rules), first);
    }
}

#[test]
fn findings_survive_an_ir_json_roundtrip() {
    let prog = lower(SSRF_HANDLER);
    let rules = default_rules();
    let before = analyze_ir(&prog, "handler.go", &rules);

    let json = serde_json::to_string(&prog).expect("serialize program");
    let reloaded: ProgramIR = serde_json::from_str(&json).expect("deserialize program");
    let after = analyze_ir(&reloaded, "handler.go", &rules);

    assert_eq!(before, after);
    assert!(!before.is_empty());
}
