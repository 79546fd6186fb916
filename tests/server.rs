// FSK.listen end to end: requests served on the evaluator thread over
// loopback, handler failures answered with 500, and late replies

mod common;

use common::{output, run};

#[test]
fn handler_failure_answers_500_and_the_server_keeps_serving() {
    let outcome = run(
        r#"let served = [];
           let server = FSK.listen(0, fn(req) {
               served.push(req.method + " " + req.path);
               if (req.path == "/boom") {
                   throw "handler failed";
               }
               req.send("hello " + req.path);
           });
           let base = "http://127.0.0.1:" + server.port;
           FSK.fetch(base + "/boom").catch(fn(error) {
               print "boom rejected";
               FSK.fetch(base + "/greet?x=1").then(fn(body) {
                   print body;
                   print served;
                   print server.close();
               });
           });"#,
    );
    assert!(
        outcome
            .stderr
            .contains("[E007] Uncaught exception: handler failed"),
        "stderr was {:?}",
        outcome.stderr
    );
    assert_eq!(
        outcome.expect_ok(),
        "boom rejected\nhello /greet\n[GET /boom, GET /greet]\ntrue\n"
    );
}

#[test]
fn requests_can_be_answered_later() {
    let out = output(
        r#"let server = FSK.listen(0, fn(req) {
               setTimeout(fn() { print req.send("later", 201); }, 10);
           });
           FSK.fetch("http://127.0.0.1:" + server.port + "/").then(fn(body) {
               print body;
               server.close();
               print server.close();
           });"#,
    );
    assert_eq!(out, "true\nlater\nfalse\n");
}

#[test]
fn listen_checks_its_arguments() {
    let out = output(
        r#"try { FSK.listen("80", fn(req) {}); } catch (e) { print "port"; }
           try { FSK.listen(0, 5); } catch (e) { print "handler"; }
           try { FSK.listen(70000, fn(req) {}); } catch (e) { print "range"; }"#,
    );
    assert_eq!(out, "port\nhandler\nrange\n");
}

//=====================================================
// End of file
//=====================================================
