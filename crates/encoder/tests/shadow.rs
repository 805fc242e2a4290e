use encoder::mime::TEXT_HTML;
use encoder::{DocumentEncoder, Encoder, EncoderFlags};
use encoder_test_support::Fixture;

const HOST: &str = "<div id=host><shadowroot><p>[in</p><slot></slot></shadowroot>\
                    <span>li]ght</span></div>";

fn encode(fx: &Fixture, flags: EncoderFlags, setup: impl FnOnce(&mut DocumentEncoder<'_>)) -> String {
    let mut encoder = DocumentEncoder::new();
    encoder.init(&fx.doc, TEXT_HTML, flags).unwrap();
    setup(&mut encoder);
    encoder.encode_to_string().unwrap()
}

#[test]
fn document_walk_enters_author_shadow_roots_only_when_allowed() {
    let fx = Fixture::parse(HOST);
    assert_eq!(
        encode(&fx, EncoderFlags::empty(), |_| {}),
        "<div id=\"host\"><span>light</span></div>"
    );
    assert_eq!(
        encode(&fx, EncoderFlags::ALLOW_CROSS_SHADOW_BOUNDARY, |_| {}),
        "<div id=\"host\"><p>in</p><slot><span>light</span></slot></div>"
    );
}

#[test]
fn widget_shadow_roots_stay_opaque() {
    let fx = Fixture::parse("<video id=v><shadowroot mode=ua><div>controls</div></shadowroot></video>");
    assert_eq!(
        encode(&fx, EncoderFlags::ALLOW_CROSS_SHADOW_BOUNDARY, |_| {}),
        "<video id=\"v\"></video>"
    );
}

#[test]
fn named_slots_take_matching_light_children() {
    let fx = Fixture::parse(
        "<div><shadowroot><h1><slot name=title></slot></h1><slot></slot></shadowroot>\
         <p>body</p><b slot=title>T</b></div>",
    );
    assert_eq!(
        encode(&fx, EncoderFlags::ALLOW_CROSS_SHADOW_BOUNDARY, |_| {}),
        "<div><h1><slot name=\"title\"><b slot=\"title\">T</b></slot></h1><slot><p>body</p></slot></div>"
    );
}

#[test]
fn flat_range_crosses_from_shadow_tree_into_slotted_content() {
    let fx = Fixture::parse(HOST);
    let range = fx.flat_range();
    assert_eq!(
        encode(&fx, EncoderFlags::ALLOW_CROSS_SHADOW_BOUNDARY, |e| e.set_range(range)),
        "<p>in</p><slot><span>li</span></slot>"
    );
}

#[test]
fn flat_range_without_the_flag_has_no_common_ancestor() {
    let fx = Fixture::parse(HOST);
    let range = fx.flat_range();
    assert_eq!(encode(&fx, EncoderFlags::empty(), |e| e.set_range(range)), "");
}

#[test]
fn collapsed_flat_range_is_still_walked() {
    let fx = Fixture::parse("<div id=host><shadowroot><p>a{}b</p></shadowroot></div>");
    let range = fx.flat_range();
    assert!(range.collapsed());
    assert_eq!(
        encode(&fx, EncoderFlags::ALLOW_CROSS_SHADOW_BOUNDARY, |e| e.set_range(range)),
        ""
    );
}
