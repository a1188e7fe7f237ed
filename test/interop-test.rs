// Tests the interop of grading data to and from exchange formats
use pilegrade::io::landxml::*;
use pilegrade::*;

fn read(file: &str) -> Vec<u8> {
    std::fs::read(std::path::Path::new("test").join(file)).unwrap()
}

fn same(p1: Point3, p2: Point3) -> bool {
    (p1[0] - p2[0]).abs() < 1e-5 && (p1[1] - p2[1]).abs() < 1e-5 && (p1[2] - p2[2]).abs() < 1e-3
}

fn do_round_trip_test<T, D, S, Ed>(file: &str, deserialize: D, serialize: S)
where
    D: Fn(&[u8]) -> std::result::Result<T, Ed>,
    S: Fn(&T) -> Vec<u8>,
    Ed: std::fmt::Debug,
    T: PartialEq + std::fmt::Debug,
{
    let i = deserialize(&read(file)).unwrap();
    let ser = serialize(&i);
    let de = deserialize(&ser).unwrap();
    assert_eq!(i, de);
}

/// Three rows of five piles, 6 apart in x and 7.5 apart in y.
fn field() -> Vec<Pile> {
    let mut piles = Vec::new();
    for r in 0..3 {
        for i in 0..5 {
            let x = 1000.0 + r as f64 * 6.0;
            let y = 2000.0 + i as f64 * 7.5;
            let existing = 100.0 + i as f64 * 0.4 - r as f64 * 0.1;
            let target = 105.0 + i as f64 * 0.6 + r as f64 * 0.25;
            let (id, row) = (format!("{}{}", r, i), format!("R{}", r));
            piles.push(Pile::new(id, row, [x, y], existing, target));
        }
    }
    piles
}

/// Triangulate between neighbouring rows of the graded surface.
fn graded_surface(piles: &[Pile]) -> Vec<Tri> {
    let rows = group_rows(piles, Axis::Northing);
    let pt = |i: usize| {
        let p = &piles[i];
        [p.x, p.y, p.grade.unwrap()]
    };
    rows.windows(2)
        .flat_map(|w| {
            let (a, b) = (w[0].idxs(), w[1].idxs());
            (1..a.len().min(b.len())).flat_map(move |i| {
                [
                    [pt(a[i - 1]), pt(b[i - 1]), pt(b[i])],
                    [pt(a[i - 1]), pt(b[i]), pt(a[i])],
                ]
            })
        })
        .collect()
}

// Test the importing of 'two-rows.xml' -- a LandXML TIN with sparse point ids.
// 'two-rows.xml' was built with:
// - two rows of 3 points, 20.5 apart in x and 20 apart in y
// - faces strung between the rows
#[test]
fn test_two_rows_import() {
    let (header, mesh) = from_landxml(&read("two-rows.xml")).unwrap();

    assert_eq!(header.name, "Piles");
    assert_eq!(header.unit, LinearUnit::Foot);
    assert_eq!(header.date.as_deref(), Some("2024-05-02"));
    assert_eq!(header.time.as_deref(), Some("14:05:00"));

    assert_eq!(mesh.vertex_len(), 6);
    assert_eq!(mesh.face_len(), 4);
    assert_eq!(mesh.vertex(1), Some([5000.0, 2000.0, 101.25]));
    assert_eq!(mesh.vertex(6), Some([5020.5, 2040.0, 101.6]));
    assert_eq!(
        mesh.faces(),
        &[[1, 4, 5], [1, 5, 2], [2, 5, 6], [2, 6, 3]]
    );

    let (min, max) = mesh.extents().unwrap();
    assert_eq!(min, [5000.0, 2000.0, 100.75]);
    assert_eq!(max, [5020.5, 2040.0, 102.475]);
}

#[test]
fn test_two_rows_export() {
    do_round_trip_test(
        "two-rows.xml",
        from_landxml,
        |(header, mesh): &(Header, Mesh)| to_landxml(header, mesh),
    );
}

#[test]
fn test_graded_surface_export() {
    let mut piles = field();
    let report = Grader::new(GradingParams::default())
        .run(&mut piles)
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(report.rows.len(), 3);

    for p in &piles {
        let reveal = p.reveal.unwrap();
        assert!((4.0..=6.0).contains(&reveal), "{}: {}", p.id, reveal);
        assert!((p.grade.unwrap() + reveal - p.target_elevation).abs() < 1e-9);
        assert!((p.slope.unwrap() - -8.0).abs() < 1e-9);
    }

    let tris = graded_surface(&piles);
    assert_eq!(tris.len(), 16);
    let mesh = Mesh::from_triangles(&tris).unwrap();
    assert_eq!(mesh.vertex_len(), 15);
    assert_eq!(mesh.face_len(), 16);

    let header = Header::new("Graded", LinearUnit::Meter);
    let (h, read_back) = from_landxml(&to_landxml(&header, &mesh)).unwrap();
    assert_eq!(h, header);
    assert_eq!(read_back.faces(), mesh.faces());
    for (a, b) in read_back.vertices().iter().zip(mesh.vertices()) {
        assert!(same(*a, *b), "{:?} != {:?}", a, b);
    }
}

#[test]
fn test_malformed_surface_export() {
    let a = [0.0, 0.0, 0.0];
    let b = [1.0, 0.0, 0.0];
    let c = [1.0, 1.0, 0.0];
    let tris: Vec<Vec<Point3>> = vec![vec![a, b, c], vec![b, c]];

    let e = Mesh::from_triangles(&tris).unwrap_err();
    assert_eq!(
        e,
        GradeError::MalformedTriangle {
            index: 1,
            points: vec![b, c]
        }
    );
    assert!(e.to_string().contains("index 1"));
}

#[test]
fn test_piles_from_json() {
    let json = r#"[
        { "id": "1", "row_id": "A", "x": 0.0, "y": 0.0, "existing_grade": 100.0, "target_elevation": 110.0 },
        { "id": "2", "row_id": "A", "x": 0.0, "y": 10.0, "existing_grade": 100.0, "target_elevation": 104.0,
          "min_reveal": 2.0, "max_reveal": 8.0 },
        { "id": "3", "row_id": "A", "x": 0.0, "y": 20.0, "existing_grade": 100.0, "target_elevation": 98.0,
          "flood_depth": 0.2 }
    ]"#;
    let mut piles: Vec<Pile> = serde_json::from_str(json).unwrap();
    let report = Grader::new(GradingParams::default())
        .run(&mut piles)
        .unwrap();
    assert!(report.is_clean());

    assert_eq!(piles[0].reveal, Some(6.0));
    assert_eq!(piles[0].grade, Some(104.0));
    assert_eq!(piles[1].reveal, Some(4.0));
    assert_eq!(piles[1].grade, Some(100.0));
    assert_eq!(piles[2].reveal, Some(4.0));
    assert_eq!(piles[2].grade, Some(94.0));

    let out = serde_json::to_value(&piles).unwrap();
    assert_eq!(out[0]["reveal"], 6.0);
    assert_eq!(out[2]["flood_depth"], 0.2);
    assert_eq!(out[1]["slope"], piles[1].slope.unwrap());
}
