use jre_provision::{oom_dump_option, IbmJdk, ProvisionError};
use pretty_assertions::assert_eq;

use crate::suite::fixtures::Staging;

const OOM: &str = "-Xdump:tool:events=systhrow,filter=java/lang/OutOfMemoryError,request=serial+exclusive,exec=./.buildpack-diagnostics/killjava.sh";

fn released_opts(budget: Option<&str>) -> Vec<String> {
    let staging = Staging::new();
    let mut context = staging.context();
    context.java_opts.push("-Dpreset=1".to_owned());

    let mut jdk = IbmJdk::new(&mut context, staging.collaborators(budget)).unwrap();
    let compiled = jdk.compile().unwrap();
    jdk.release(compiled).unwrap();
    drop(jdk);

    assert_eq!(context.java_opts[0], "-Dpreset=1");
    context.java_opts
}

#[test]
fn oom_option_points_at_killjava() {
    assert_eq!(oom_dump_option(), OOM);
}

#[test]
fn no_budget() {
    assert_eq!(
        released_opts(None),
        vec!["-Dpreset=1", OOM, "-Xnocompressedrefs", "-Xtune:virtualized"]
    );
}

#[test]
fn budget_below_threshold() {
    assert_eq!(
        released_opts(Some("256M")),
        vec![
            "-Dpreset=1",
            OOM,
            "-Xnocompressedrefs",
            "-Xtune:virtualized",
            "-Xmx192M"
        ]
    );
}

#[test]
fn budget_above_threshold() {
    assert_eq!(
        released_opts(Some("1024M")),
        vec!["-Dpreset=1", OOM, "-Xtune:virtualized", "-Xmx768M"]
    );
}

#[test]
fn budget_at_threshold() {
    assert_eq!(
        released_opts(Some("512M")),
        vec!["-Dpreset=1", OOM, "-Xtune:virtualized", "-Xmx384M"]
    );
}

#[test]
fn zero_budget_is_passed_through() {
    let opts = released_opts(Some("0"));
    assert_eq!(opts.last().map(String::as_str), Some("-Xmx0"));
}

#[test]
fn compile_token_only_releases_its_own_provisioner() {
    let first = Staging::new();
    let second = Staging::new();
    let mut first_context = first.context();
    let mut second_context = second.context();

    let first_jdk = IbmJdk::new(&mut first_context, first.collaborators(None)).unwrap();
    let mut second_jdk = IbmJdk::new(&mut second_context, second.collaborators(None)).unwrap();

    let token = first_jdk.compile().unwrap();
    let err = second_jdk.release(token).unwrap_err();
    assert!(
        matches!(err, ProvisionError::ForeignCompileToken { .. }),
        "{err}"
    );
    drop(second_jdk);
    drop(first_jdk);

    assert!(second_context.java_opts.is_empty());
    assert!(first_context.java_opts.is_empty());
}
