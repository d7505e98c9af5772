/// Integration tests for the view argument grammar shared by the command line
/// and the configuration file
use common::{MediaKind, Rect, ViewSpec, WeaverError, parse_view_args};
use std::path::Path;

#[test]
fn test_groups_of_six_become_views_in_order() {
    let views = parse_view_args(&[
        "~/media/loop.gif", "2", "-100", "-5", "640", "480",
        "/srv/still.png", "1", "0", "0", "1920", "1080",
        "/srv/clips", "4", "10", "20", "320", "240",
    ])
    .unwrap();

    assert_eq!(views.len(), 3);
    assert_eq!(
        views[0],
        ViewSpec {
            path: "~/media/loop.gif".into(),
            rect: Rect::new(-100, -5, 640, 480),
            speed: 2,
        }
    );
    assert_eq!(views[1].rect, Rect::new(0, 0, 1920, 1080));
    assert_eq!(views[2].path, Path::new("/srv/clips"));
    assert_eq!(views[2].speed, 4);
}

#[test]
fn test_no_arguments_is_no_views() {
    let views = parse_view_args::<&str>(&[]).unwrap();
    assert!(views.is_empty());
}

#[test]
fn test_incomplete_group_is_usage_error() {
    for count in [1, 5, 7, 11] {
        let args = vec!["1"; count];
        assert!(
            matches!(parse_view_args(&args), Err(WeaverError::Usage(_))),
            "{} values should be rejected",
            count
        );
    }
}

#[test]
fn test_non_positive_speed_normalizes_to_one() {
    let views = parse_view_args(&[
        "a.gif", "0", "0", "0", "10", "10",
        "b.gif", "-7", "0", "0", "10", "10",
    ])
    .unwrap();

    assert!(views.iter().all(|view| view.speed == 1));
}

#[test]
fn test_malformed_numbers_name_the_field() {
    let err = parse_view_args(&["a.gif", "fast", "0", "0", "10", "10"]).unwrap_err();
    assert!(err.to_string().contains("SPEED"));

    let err = parse_view_args(&[
        "a.gif", "1", "0", "0", "10", "10",
        "b.gif", "1", "0", "0", "-10", "10",
    ])
    .unwrap_err();
    assert!(err.to_string().contains("view 2: invalid W"));
}

#[test]
fn test_media_classification_by_extension() {
    for name in ["a.mp4", "a.webm", "a.MKV", "a.avi", "a.mov"] {
        assert_eq!(MediaKind::from_path(name), Some(MediaKind::Video), "{}", name);
    }
    assert_eq!(MediaKind::from_path("a.GIF"), Some(MediaKind::Gif));
    for name in ["a.png", "a.jpg", "a.jpeg", "a.bmp", "a.tiff", "a.webp", "a.tga"] {
        assert_eq!(MediaKind::from_path(name), Some(MediaKind::Image), "{}", name);
    }
    assert_eq!(MediaKind::from_path("a.svg"), None);
}

#[test]
fn test_window_size_covers_all_views() {
    let views = parse_view_args(&[
        "a.gif", "1", "0", "0", "640", "480",
        "b.png", "1", "600", "400", "200", "100",
        "c.png", "1", "-50", "-50", "20", "20",
    ])
    .unwrap();

    let size = Rect::bounding_size(views.iter().map(|view| &view.rect));
    assert_eq!(size, Some((800, 500)));
}
